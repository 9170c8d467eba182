//! Local AACGM frames from finite differences of the point transform
//!
//! AACGM has no closed-form derivative, so the local geometry of the map is
//! probed by moving the sample a small step along its geographic theta and phi
//! directions and watching where the converter sends the moved points. Three
//! conversions per sample: the base point and the two perturbed points.
//!
//! Height is held at the sample's altitude for all three conversions and the
//! converted points are placed back at the sample's radius, so only the
//! angular part of the Jacobian is captured.

use nalgebra::Vector3;
use tracing::trace;

use crate::algorithms::spherical::{
    cartesian_to_spherical, normalize, spherical_to_cartesian, spherical_vector_to_cartesian,
};
use crate::converter::{ConversionMode, PointConverter};
use crate::core::{EpochContext, GeoSample, MagneticPoint, DEFAULT_STEP_KM, EARTH_RADIUS_KM};
use crate::utils::config::TransportConfig;
use crate::validation::error::{Stage, TransportError, TransportResult};

/// Direction of a geographic perturbation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perturbation {
    Theta,
    Phi,
}

impl Perturbation {
    pub fn stage(&self) -> Stage {
        match self {
            Perturbation::Theta => Stage::ThetaPerturb,
            Perturbation::Phi => Stage::PhiPerturb,
        }
    }

    /// (Br, Bθ, Bφ) of the unit displacement
    fn components(&self) -> (f64, f64, f64) {
        match self {
            Perturbation::Theta => (0.0, 1.0, 0.0),
            Perturbation::Phi => (0.0, 0.0, 1.0),
        }
    }
}

/// Two local frames at the AACGM image of a sample
///
/// `theta_hat`/`phi_from_theta` are anchored on the theta perturbation,
/// `theta_from_phi`/`phi_raw` on the phi perturbation. The map is not
/// conformal, so the two frames generally differ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalBasis {
    /// AACGM image of the sample
    pub base: MagneticPoint,
    /// AACGM image of the theta-perturbed point
    pub theta_point: MagneticPoint,
    /// AACGM image of the phi-perturbed point
    pub phi_point: MagneticPoint,
    /// Cartesian position of `base` at the sample radius (km)
    pub base_xyz: Vector3<f64>,
    pub r_hat: Vector3<f64>,
    pub theta_hat: Vector3<f64>,
    pub phi_raw: Vector3<f64>,
    /// normalize(r̂ × θ̂)
    pub phi_from_theta: Vector3<f64>,
    /// normalize(φ̂_raw × r̂)
    pub theta_from_phi: Vector3<f64>,
}

/// Builds [`LocalBasis`] values for samples under one epoch
pub struct LocalFrameBuilder<'a, C: ?Sized> {
    converter: &'a C,
    epoch: &'a EpochContext,
    mode: ConversionMode,
    step_km: f64,
    earth_radius_km: f64,
}

impl<'a, C: PointConverter + ?Sized> LocalFrameBuilder<'a, C> {
    pub fn new(converter: &'a C, epoch: &'a EpochContext) -> Self {
        Self {
            converter,
            epoch,
            mode: ConversionMode::G2A,
            step_km: DEFAULT_STEP_KM,
            earth_radius_km: EARTH_RADIUS_KM,
        }
    }

    pub fn from_config(converter: &'a C, epoch: &'a EpochContext, config: &TransportConfig) -> Self {
        Self {
            converter,
            epoch,
            mode: config.mode,
            step_km: config.step_km,
            earth_radius_km: config.earth_radius_km,
        }
    }

    /// Extra mode flags; the direction bit is always forced to G2A
    pub fn with_mode(mut self, mode: ConversionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_step_km(mut self, step_km: f64) -> Self {
        self.step_km = step_km;
        self
    }

    pub fn with_earth_radius_km(mut self, earth_radius_km: f64) -> Self {
        self.earth_radius_km = earth_radius_km;
        self
    }

    pub fn step_km(&self) -> f64 {
        self.step_km
    }

    /// Convert the sample position itself
    pub fn convert_base(&self, sample: &GeoSample) -> TransportResult<MagneticPoint> {
        self.convert(Stage::Base, sample, sample.lat_deg(), sample.lon_deg())
    }

    /// Convert the sample position moved one step along `direction`
    pub fn convert_perturbed(&self, sample: &GeoSample, direction: Perturbation) -> TransportResult<MagneticPoint> {
        let (lat_deg, lon_deg) = self.perturbed_position(sample, direction)?;
        self.convert(direction.stage(), sample, lat_deg, lon_deg)
    }

    /// Geographic latitude/longitude (degrees) of the perturbed position
    pub fn perturbed_position(&self, sample: &GeoSample, direction: Perturbation) -> TransportResult<(f64, f64)> {
        let geo_xyz = spherical_to_cartesian(sample.r_km, sample.colat_rad, sample.lon_rad);
        let (br, bth, bph) = direction.components();
        let shift = spherical_vector_to_cartesian(sample.colat_rad, sample.lon_rad, br, bth, bph) * self.step_km;

        // only the angular position is kept; the radius of the moved point is discarded
        let (_, colat, lon) = cartesian_to_spherical(&(geo_xyz + shift))?;
        Ok((90.0 - colat.to_degrees(), lon.to_degrees()))
    }

    /// Difference the three AACGM points into the two local frames
    pub fn assemble(
        &self,
        sample: &GeoSample,
        base: MagneticPoint,
        theta_point: MagneticPoint,
        phi_point: MagneticPoint,
    ) -> TransportResult<LocalBasis> {
        let base_xyz = spherical_to_cartesian(sample.r_km, base.colat_rad(), base.lon_rad());
        let theta_xyz = spherical_to_cartesian(sample.r_km, theta_point.colat_rad(), theta_point.lon_rad());
        let phi_xyz = spherical_to_cartesian(sample.r_km, phi_point.colat_rad(), phi_point.lon_rad());

        let r_hat = normalize(&base_xyz, "AACGM base position")?;
        let theta_hat = normalize(&(theta_xyz - base_xyz), "theta-perturbation difference")?;
        let phi_raw = normalize(&(phi_xyz - base_xyz), "phi-perturbation difference")?;
        let phi_from_theta = normalize(&r_hat.cross(&theta_hat), "r̂ × θ̂")?;
        let theta_from_phi = normalize(&phi_raw.cross(&r_hat), "φ̂ × r̂")?;

        Ok(LocalBasis {
            base,
            theta_point,
            phi_point,
            base_xyz,
            r_hat,
            theta_hat,
            phi_raw,
            phi_from_theta,
            theta_from_phi,
        })
    }

    /// Run all three conversions and assemble the frames
    pub fn build(&self, sample: &GeoSample) -> TransportResult<LocalBasis> {
        let base = self.convert_base(sample)?;
        let theta_point = self.convert_perturbed(sample, Perturbation::Theta)?;
        let phi_point = self.convert_perturbed(sample, Perturbation::Phi)?;
        self.assemble(sample, base, theta_point, phi_point)
    }

    fn convert(&self, stage: Stage, sample: &GeoSample, lat_deg: f64, lon_deg: f64) -> TransportResult<MagneticPoint> {
        let height_km = sample.height_km(self.earth_radius_km);
        let mode = ConversionMode::from_bits(self.mode.bits() & !ConversionMode::A2G.bits());

        let point = self
            .converter
            .convert_point(self.epoch, lat_deg, lon_deg, height_km, mode)
            .map_err(|cause| TransportError::conversion(stage, cause))?;

        let point = MagneticPoint::new(point.mlat_deg, point.mlon_deg, point.r_re);
        trace!(
            stage = %stage,
            lat_deg,
            lon_deg,
            height_km,
            mlat_deg = point.mlat_deg,
            mlon_deg = point.mlon_deg,
            "converted point"
        );
        Ok(point)
    }
}
