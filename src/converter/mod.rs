//! Point conversion between geographic and magnetic coordinates
//!
//! The transport core never evaluates the magnetic field itself. It consumes a
//! [`PointConverter`] that maps a single geographic point to AACGM (or back).
//! Implementations include a centred-dipole reference model and the stubs in
//! [`mock`] used by tests.

pub mod error;
pub mod dipole;
pub mod mock;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

use crate::core::{EpochContext, EpochError, MagneticPoint, MAX_COEFFICIENT_HEIGHT_KM};

pub use dipole::DipoleConverter;
pub use error::{ConversionError, ConversionResult};

/// Bit flags selecting direction and evaluation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionMode(u32);

impl ConversionMode {
    /// Geographic to AACGM
    pub const G2A: Self = Self(0);
    /// AACGM to geographic
    pub const A2G: Self = Self(1);
    /// Use field-line tracing instead of coefficients
    pub const TRACE: Self = Self(2);
    /// Trace automatically above the coefficient height limit
    pub const ALLOW_TRACE: Self = Self(4);
    /// Use coefficients above the height limit anyway
    pub const BAD_IDEA: Self = Self(8);
    /// Treat input as geocentric rather than geodetic
    pub const GEOCENTRIC: Self = Self(16);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_inverse(&self) -> bool {
        self.contains(Self::A2G)
    }

    /// True when any flag lifts the coefficient height limit
    pub const fn overrides_height_limit(&self) -> bool {
        self.0 & (Self::TRACE.0 | Self::ALLOW_TRACE.0 | Self::BAD_IDEA.0) != 0
    }
}

impl BitOr for ConversionMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.is_inverse() { "A2G" } else { "G2A" };
        write!(f, "{}", direction)?;
        for (flag, name) in [
            (Self::TRACE, "TRACE"),
            (Self::ALLOW_TRACE, "ALLOW_TRACE"),
            (Self::BAD_IDEA, "BAD_IDEA"),
            (Self::GEOCENTRIC, "GEOCENTRIC"),
        ] {
            if self.contains(flag) {
                write!(f, "|{}", name)?;
            }
        }
        Ok(())
    }
}

/// Maps one point between geographic and AACGM coordinates
///
/// Implementations must be deterministic for a fixed epoch. Converters that
/// are not safe to call concurrently keep the default `is_reentrant`, and the
/// batch driver serializes calls into them.
pub trait PointConverter: Send + Sync {
    /// Convert a point; longitudes may come back in any range
    fn convert_point(
        &self,
        epoch: &EpochContext,
        lat_deg: f64,
        lon_deg: f64,
        height_km: f64,
        mode: ConversionMode,
    ) -> ConversionResult<MagneticPoint>;

    /// Check that the model can be evaluated at this epoch
    fn check_epoch(&self, _epoch: &EpochContext) -> Result<(), EpochError> {
        Ok(())
    }

    /// Whether concurrent calls are safe
    fn is_reentrant(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "point-converter"
    }
}

impl<C: PointConverter + ?Sized> PointConverter for Box<C> {
    fn convert_point(
        &self,
        epoch: &EpochContext,
        lat_deg: f64,
        lon_deg: f64,
        height_km: f64,
        mode: ConversionMode,
    ) -> ConversionResult<MagneticPoint> {
        (**self).convert_point(epoch, lat_deg, lon_deg, height_km, mode)
    }

    fn check_epoch(&self, epoch: &EpochContext) -> Result<(), EpochError> {
        (**self).check_epoch(epoch)
    }

    fn is_reentrant(&self) -> bool {
        (**self).is_reentrant()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Input checks shared by converter implementations
pub fn check_inputs(lat_deg: f64, lon_deg: f64, height_km: f64, mode: ConversionMode) -> ConversionResult<()> {
    if !lat_deg.is_finite() || !lon_deg.is_finite() || !height_km.is_finite() {
        return Err(ConversionError::InvalidInput {
            reason: format!("non-finite input ({}, {}, {})", lat_deg, lon_deg, height_km),
        });
    }

    if !(-90.0..=90.0).contains(&lat_deg) {
        return Err(ConversionError::InvalidInput {
            reason: format!("latitude {} outside [-90, 90]", lat_deg),
        });
    }

    if height_km > MAX_COEFFICIENT_HEIGHT_KM && !mode.overrides_height_limit() {
        return Err(ConversionError::HeightTooHigh {
            height_km,
            limit_km: MAX_COEFFICIENT_HEIGHT_KM,
        });
    }

    Ok(())
}
