//! Core data types for vector transport

use serde::{Deserialize, Serialize};

use crate::algorithms::spherical::normalize_longitude_deg;
use crate::validation::error::TransportError;

/// Field-perturbation sample in the geographic spherical frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    /// Geocentric radius (km)
    pub r_km: f64,
    /// Geographic colatitude (radians, measured from the north pole)
    pub colat_rad: f64,
    /// Geographic longitude (radians)
    pub lon_rad: f64,
    /// Perturbation along the local theta (southward) direction
    pub db_theta: f64,
    /// Perturbation along the local phi (eastward) direction
    pub db_phi: f64,
}

impl GeoSample {
    pub fn new(r_km: f64, colat_rad: f64, lon_rad: f64, db_theta: f64, db_phi: f64) -> Self {
        Self {
            r_km,
            colat_rad,
            lon_rad,
            db_theta,
            db_phi,
        }
    }

    /// Build a sample from latitude/longitude in degrees and height above the reference sphere
    pub fn from_geodetic(
        lat_deg: f64,
        lon_deg: f64,
        height_km: f64,
        db_theta: f64,
        db_phi: f64,
        earth_radius_km: f64,
    ) -> Self {
        Self {
            r_km: earth_radius_km + height_km,
            colat_rad: (90.0 - lat_deg).to_radians(),
            lon_rad: lon_deg.to_radians(),
            db_theta,
            db_phi,
        }
    }

    pub fn lat_deg(&self) -> f64 {
        90.0 - self.colat_rad.to_degrees()
    }

    pub fn lon_deg(&self) -> f64 {
        self.lon_rad.to_degrees()
    }

    /// Height above a sphere of the given radius (km)
    pub fn height_km(&self, earth_radius_km: f64) -> f64 {
        self.r_km - earth_radius_km
    }

    /// Reject samples that cannot be placed on a sphere
    pub fn validate(&self) -> Result<(), TransportError> {
        let fields = [
            ("r_km", self.r_km),
            ("colat_rad", self.colat_rad),
            ("lon_rad", self.lon_rad),
            ("db_theta", self.db_theta),
            ("db_phi", self.db_phi),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(TransportError::InvalidSample {
                reason: format!("{} is not finite ({})", name, value),
            });
        }

        if self.r_km <= 0.0 {
            return Err(TransportError::InvalidSample {
                reason: format!("radius must be positive, got {} km", self.r_km),
            });
        }

        Ok(())
    }
}

/// Point returned by a converter, longitude always in [0, 360)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagneticPoint {
    /// Magnetic latitude (degrees)
    pub mlat_deg: f64,
    /// Magnetic longitude (degrees)
    pub mlon_deg: f64,
    /// Geocentric distance in Earth radii
    pub r_re: f64,
}

impl MagneticPoint {
    pub fn new(mlat_deg: f64, mlon_deg: f64, r_re: f64) -> Self {
        Self {
            mlat_deg,
            mlon_deg: normalize_longitude_deg(mlon_deg),
            r_re,
        }
    }

    pub fn colat_rad(&self) -> f64 {
        (90.0 - self.mlat_deg).to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.mlon_deg.to_radians()
    }
}

/// Transported field components for one sample
///
/// The `_th` pair comes from the frame anchored on the theta perturbation,
/// the `_ph` pair from the frame anchored on the phi perturbation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputSample {
    pub db_theta_th: f64,
    pub db_phi_th: f64,
    pub db_theta_ph: f64,
    pub db_phi_ph: f64,
    /// AACGM colatitude of the base point (radians)
    pub aacgm_colat_rad: f64,
    /// AACGM longitude of the base point (radians, [0, 2π))
    pub aacgm_lon_rad: f64,
}

impl OutputSample {
    /// Squared horizontal magnitude of the theta-anchored pair
    pub fn magnitude_sq_th(&self) -> f64 {
        self.db_theta_th * self.db_theta_th + self.db_phi_th * self.db_phi_th
    }

    /// Squared horizontal magnitude of the phi-anchored pair
    pub fn magnitude_sq_ph(&self) -> f64 {
        self.db_theta_ph * self.db_theta_ph + self.db_phi_ph * self.db_phi_ph
    }
}
