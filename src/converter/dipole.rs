//! Altitude-adjusted centred-dipole point converter
//!
//! A lightweight stand-in for AACGM: geographic positions are rotated into
//! centred-dipole coordinates, then followed along the dipole field line
//! (r = L cos²λ) down to the reference sphere. The dipole axis tracks the
//! IGRF geomagnetic north pole, interpolated between model epochs.
//!
//! Longitude zero is the meridian opposite the geographic north pole, so the
//! geographic pole sits at 180° magnetic longitude.

use nalgebra::{Rotation3, Vector3};
use tracing::debug;

use crate::algorithms::spherical::{cartesian_to_spherical, spherical_to_cartesian};
use crate::converter::{check_inputs, ConversionError, ConversionMode, ConversionResult, PointConverter};
use crate::core::{EpochContext, EpochError, MagneticPoint, EARTH_RADIUS_KM};

/// IGRF geomagnetic north pole (epoch year, latitude, longitude in degrees)
const DIPOLE_POLES: [(f64, f64, f64); 6] = [
    (2000.0, 79.54, -71.57),
    (2005.0, 79.82, -71.81),
    (2010.0, 80.08, -72.21),
    (2015.0, 80.37, -72.63),
    (2020.0, 80.65, -72.68),
    (2025.0, 80.85, -72.76),
];

/// First supported epoch year
pub const DIPOLE_MIN_YEAR: i32 = 2000;
/// First unsupported epoch year; the last interval is extrapolated up to here
pub const DIPOLE_MAX_YEAR: i32 = 2030;

#[derive(Debug, Clone, Copy, PartialEq)]
enum PoleSource {
    Igrf,
    Fixed { lat_deg: f64, lon_deg: f64 },
}

/// Centred-dipole converter with field-line altitude adjustment
#[derive(Debug, Clone)]
pub struct DipoleConverter {
    poles: PoleSource,
    earth_radius_km: f64,
}

impl Default for DipoleConverter {
    fn default() -> Self {
        Self {
            poles: PoleSource::Igrf,
            earth_radius_km: EARTH_RADIUS_KM,
        }
    }
}

impl DipoleConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dipole axis fixed at one pole regardless of epoch
    pub fn with_fixed_pole(lat_deg: f64, lon_deg: f64) -> Self {
        Self {
            poles: PoleSource::Fixed { lat_deg, lon_deg },
            ..Default::default()
        }
    }

    pub fn with_earth_radius_km(mut self, earth_radius_km: f64) -> Self {
        self.earth_radius_km = earth_radius_km;
        self
    }

    /// Geomagnetic north pole (lat, lon in degrees) at an epoch
    pub fn pole_at(&self, epoch: &EpochContext) -> (f64, f64) {
        match self.poles {
            PoleSource::Fixed { lat_deg, lon_deg } => (lat_deg, lon_deg),
            PoleSource::Igrf => interpolate_pole(epoch.decimal_year()),
        }
    }

    fn rotation(&self, epoch: &EpochContext) -> Rotation3<f64> {
        let (pole_lat, pole_lon) = self.pole_at(epoch);
        let pole_colat = (90.0 - pole_lat).to_radians();
        Rotation3::from_axis_angle(&Vector3::y_axis(), -pole_colat)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), -pole_lon.to_radians())
    }

    fn geographic_to_aacgm(&self, epoch: &EpochContext, lat_deg: f64, lon_deg: f64, r: f64) -> ConversionResult<(f64, f64)> {
        let unit = spherical_to_cartesian(1.0, (90.0 - lat_deg).to_radians(), lon_deg.to_radians());
        let (_, colat, lon) =
            cartesian_to_spherical(&(self.rotation(epoch) * unit)).map_err(|_| ConversionError::NoConvergence)?;
        let dipole_lat = std::f64::consts::FRAC_PI_2 - colat;

        // footpoint of the field line through (r, λ): cos²λ0 = cos²λ / r
        let cos_foot = (dipole_lat.cos() / r.sqrt()).clamp(0.0, 1.0);
        let mlat = cos_foot.acos().copysign(dipole_lat);

        Ok((mlat.to_degrees(), lon.to_degrees()))
    }

    fn aacgm_to_geographic(&self, epoch: &EpochContext, mlat_deg: f64, mlon_deg: f64, r: f64) -> ConversionResult<(f64, f64)> {
        let foot_lat = mlat_deg.to_radians();
        let cos_lat = foot_lat.cos() * r.sqrt();
        if cos_lat > 1.0 {
            // field line peaks below this altitude
            return Err(ConversionError::NoConvergence);
        }
        let dipole_lat = cos_lat.max(0.0).acos().copysign(foot_lat);

        let unit = spherical_to_cartesian(
            1.0,
            std::f64::consts::FRAC_PI_2 - dipole_lat,
            mlon_deg.to_radians(),
        );
        let (_, colat, lon) = cartesian_to_spherical(&(self.rotation(epoch).inverse() * unit))
            .map_err(|_| ConversionError::NoConvergence)?;

        Ok((90.0 - colat.to_degrees(), lon.to_degrees()))
    }
}

fn interpolate_pole(decimal_year: f64) -> (f64, f64) {
    let last = DIPOLE_POLES.len() - 1;
    let index = DIPOLE_POLES
        .windows(2)
        .position(|pair| decimal_year < pair[1].0)
        .unwrap_or(last - 1);

    let (y0, lat0, lon0) = DIPOLE_POLES[index];
    let (y1, lat1, lon1) = DIPOLE_POLES[index + 1];
    let t = (decimal_year - y0) / (y1 - y0);

    (lat0 + t * (lat1 - lat0), lon0 + t * (lon1 - lon0))
}

impl PointConverter for DipoleConverter {
    fn convert_point(
        &self,
        epoch: &EpochContext,
        lat_deg: f64,
        lon_deg: f64,
        height_km: f64,
        mode: ConversionMode,
    ) -> ConversionResult<MagneticPoint> {
        check_inputs(lat_deg, lon_deg, height_km, mode)?;
        if self.poles == PoleSource::Igrf {
            self.check_epoch(epoch).map_err(|_| ConversionError::EpochOutOfRange { year: epoch.year() })?;
        }
        if height_km < 0.0 {
            return Err(ConversionError::InvalidInput {
                reason: format!("height {} km below the reference sphere", height_km),
            });
        }

        let r = (self.earth_radius_km + height_km) / self.earth_radius_km;
        let (lat, lon) = if mode.is_inverse() {
            self.aacgm_to_geographic(epoch, lat_deg, lon_deg, r)?
        } else {
            self.geographic_to_aacgm(epoch, lat_deg, lon_deg, r)?
        };

        Ok(MagneticPoint::new(lat, lon, r))
    }

    fn check_epoch(&self, epoch: &EpochContext) -> Result<(), EpochError> {
        if let PoleSource::Fixed { .. } = self.poles {
            return Ok(());
        }
        epoch.ensure_year_in(DIPOLE_MIN_YEAR, DIPOLE_MAX_YEAR)?;

        let (lat, lon) = self.pole_at(epoch);
        debug!(epoch = %epoch.datetime(), pole_lat = lat, pole_lon = lon, "dipole pole for epoch");
        Ok(())
    }

    fn is_reentrant(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "centred-dipole"
    }
}
