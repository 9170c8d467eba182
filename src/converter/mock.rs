//! Stub converters with analytically known behaviour

use nalgebra::{Rotation3, Vector3};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::algorithms::spherical::{cartesian_to_spherical, spherical_to_cartesian};
use crate::converter::{check_inputs, ConversionError, ConversionMode, ConversionResult, PointConverter};
use crate::core::{EpochContext, MagneticPoint, EARTH_RADIUS_KM};

fn r_re(height_km: f64) -> f64 {
    (EARTH_RADIUS_KM + height_km) / EARTH_RADIUS_KM
}

/// Rigid rotation of the sphere carrying a chosen pole to +z
///
/// Exactly differentiable, so a transported vector must match the rotated vector.
#[derive(Debug, Clone)]
pub struct RotationConverter {
    rotation: Rotation3<f64>,
}

impl RotationConverter {
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
        }
    }

    /// Rotation moving the point (`pole_lat_deg`, `pole_lon_deg`) to the north pole
    pub fn from_pole(pole_lat_deg: f64, pole_lon_deg: f64) -> Self {
        let pole_colat = (90.0 - pole_lat_deg).to_radians();
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), -pole_colat)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), -pole_lon_deg.to_radians());
        Self { rotation }
    }

    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.rotation
    }
}

impl PointConverter for RotationConverter {
    fn convert_point(
        &self,
        _epoch: &EpochContext,
        lat_deg: f64,
        lon_deg: f64,
        height_km: f64,
        mode: ConversionMode,
    ) -> ConversionResult<MagneticPoint> {
        check_inputs(lat_deg, lon_deg, height_km, mode)?;

        let unit = spherical_to_cartesian(1.0, (90.0 - lat_deg).to_radians(), lon_deg.to_radians());
        let moved = if mode.is_inverse() {
            self.rotation.inverse() * unit
        } else {
            self.rotation * unit
        };
        let (_, colat, lon) = cartesian_to_spherical(&moved).map_err(|_| ConversionError::NoConvergence)?;

        Ok(MagneticPoint::new(90.0 - colat.to_degrees(), lon.to_degrees(), r_re(height_km)))
    }

    fn is_reentrant(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "rotation"
    }
}

/// Adds a fixed offset to longitude and leaves latitude alone
#[derive(Debug, Clone, Copy)]
pub struct LongitudeShiftConverter {
    shift_deg: f64,
}

impl LongitudeShiftConverter {
    pub fn new(shift_deg: f64) -> Self {
        Self { shift_deg }
    }
}

impl PointConverter for LongitudeShiftConverter {
    fn convert_point(
        &self,
        _epoch: &EpochContext,
        lat_deg: f64,
        lon_deg: f64,
        height_km: f64,
        mode: ConversionMode,
    ) -> ConversionResult<MagneticPoint> {
        check_inputs(lat_deg, lon_deg, height_km, mode)?;

        let shift = if mode.is_inverse() { -self.shift_deg } else { self.shift_deg };
        // raw longitude on purpose; callers are expected to normalize
        Ok(MagneticPoint {
            mlat_deg: lat_deg,
            mlon_deg: lon_deg + shift,
            r_re: r_re(height_km),
        })
    }

    fn is_reentrant(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "longitude-shift"
    }
}

/// Sends every input to the same point
#[derive(Debug, Clone, Copy)]
pub struct ConstantConverter {
    point: MagneticPoint,
}

impl ConstantConverter {
    pub fn new(mlat_deg: f64, mlon_deg: f64) -> Self {
        Self {
            point: MagneticPoint::new(mlat_deg, mlon_deg, 1.0),
        }
    }
}

impl PointConverter for ConstantConverter {
    fn convert_point(
        &self,
        _epoch: &EpochContext,
        _lat_deg: f64,
        _lon_deg: f64,
        _height_km: f64,
        _mode: ConversionMode,
    ) -> ConversionResult<MagneticPoint> {
        Ok(self.point)
    }

    fn is_reentrant(&self) -> bool {
        true
    }
}

/// Wraps a converter and fails on chosen call numbers (1-based)
///
/// Call counting makes results depend on call order, so this converter
/// reports itself as non-reentrant.
pub struct ScriptedConverter<C> {
    inner: C,
    failures: Vec<(usize, ConversionError)>,
    calls: AtomicUsize,
    modes: Mutex<Vec<ConversionMode>>,
}

impl<C: PointConverter> ScriptedConverter<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            failures: Vec::new(),
            calls: AtomicUsize::new(0),
            modes: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on_call(mut self, call: usize, error: ConversionError) -> Self {
        self.failures.push((call, error));
        self
    }

    /// Number of conversions requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Modes passed on each call, in order
    pub fn seen_modes(&self) -> Vec<ConversionMode> {
        self.modes.lock().map(|modes| modes.clone()).unwrap_or_default()
    }
}

impl<C: PointConverter> PointConverter for ScriptedConverter<C> {
    fn convert_point(
        &self,
        epoch: &EpochContext,
        lat_deg: f64,
        lon_deg: f64,
        height_km: f64,
        mode: ConversionMode,
    ) -> ConversionResult<MagneticPoint> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut modes) = self.modes.lock() {
            modes.push(mode);
        }

        if let Some((_, error)) = self.failures.iter().find(|(n, _)| *n == call) {
            return Err(error.clone());
        }

        self.inner.convert_point(epoch, lat_deg, lon_deg, height_km, mode)
    }

    fn check_epoch(&self, epoch: &EpochContext) -> Result<(), crate::core::EpochError> {
        self.inner.check_epoch(epoch)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
