//! Physical constants and transport parameters

/// Mean Earth radius used by AACGM-v2 (km)
pub const EARTH_RADIUS_KM: f64 = 6371.2;

/// Length of the Cartesian displacement used for the theta and phi perturbations (km)
pub const DEFAULT_STEP_KM: f64 = 1.0;

/// Highest altitude the coefficient expansion is valid for (km)
pub const MAX_COEFFICIENT_HEIGHT_KM: f64 = 2000.0;

/// Vectors shorter than this have no usable direction
pub const DEGENERATE_LENGTH: f64 = 1e-12;
