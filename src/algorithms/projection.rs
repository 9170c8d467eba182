//! Carry geographic field components through the local AACGM frames

use nalgebra::Vector3;

use crate::algorithms::local_frame::LocalBasis;
use crate::algorithms::spherical::cartesian_vector_to_spherical;
use crate::core::{GeoSample, OutputSample};
use crate::validation::error::TransportResult;

/// Expresses a sample's (dBθ, dBφ) in AACGM spherical components
pub struct VectorProjector;

impl VectorProjector {
    /// Transport through both frames of `basis`
    ///
    /// The geographic theta component rides on the frame's theta axis and the
    /// phi component on its phi axis; the resulting Cartesian vector is read
    /// back in the spherical basis at the AACGM base point.
    pub fn project(sample: &GeoSample, basis: &LocalBasis) -> TransportResult<OutputSample> {
        let (db_theta_th, db_phi_th) =
            Self::components_in_frame(sample, &basis.base_xyz, &basis.theta_hat, &basis.phi_from_theta)?;
        let (db_theta_ph, db_phi_ph) =
            Self::components_in_frame(sample, &basis.base_xyz, &basis.theta_from_phi, &basis.phi_raw)?;

        Ok(OutputSample {
            db_theta_th,
            db_phi_th,
            db_theta_ph,
            db_phi_ph,
            aacgm_colat_rad: basis.base.colat_rad(),
            aacgm_lon_rad: basis.base.lon_rad(),
        })
    }

    /// (Bθ, Bφ) at `position` of `dBθ·theta_axis + dBφ·phi_axis`
    pub fn components_in_frame(
        sample: &GeoSample,
        position: &Vector3<f64>,
        theta_axis: &Vector3<f64>,
        phi_axis: &Vector3<f64>,
    ) -> TransportResult<(f64, f64)> {
        let transported = theta_axis * sample.db_theta + phi_axis * sample.db_phi;
        let (_, bth, bph) = cartesian_vector_to_spherical(position, &transported)?;
        Ok((bth, bph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::spherical::{spherical_to_cartesian, spherical_unit_vectors};
    use crate::core::MagneticPoint;
    use approx::assert_relative_eq;

    fn exact_basis(colat: f64, lon: f64, r: f64) -> LocalBasis {
        let (e_r, e_theta, e_phi) = spherical_unit_vectors(colat, lon);
        let point = MagneticPoint::new(90.0 - colat.to_degrees(), lon.to_degrees(), 1.0);
        LocalBasis {
            base: point,
            theta_point: point,
            phi_point: point,
            base_xyz: spherical_to_cartesian(r, colat, lon),
            r_hat: e_r,
            theta_hat: e_theta,
            phi_raw: e_phi,
            phi_from_theta: e_phi,
            theta_from_phi: e_theta,
        }
    }

    #[test]
    fn test_exact_basis_preserves_components() {
        let sample = GeoSample::new(7000.0, 0.9, 4.2, 31.0, -7.5);
        let basis = exact_basis(0.6, 1.4, sample.r_km);

        let out = VectorProjector::project(&sample, &basis).unwrap();
        assert_relative_eq!(out.db_theta_th, 31.0, epsilon = 1e-10);
        assert_relative_eq!(out.db_phi_th, -7.5, epsilon = 1e-10);
        assert_relative_eq!(out.db_theta_ph, 31.0, epsilon = 1e-10);
        assert_relative_eq!(out.db_phi_ph, -7.5, epsilon = 1e-10);
        assert_relative_eq!(out.aacgm_colat_rad, 0.6, epsilon = 1e-12);
        assert_relative_eq!(out.aacgm_lon_rad, 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_swapped_axes_rotate_components() {
        // a frame turned 90° about r̂: θ axis along φ̂, φ axis along -θ̂
        let sample = GeoSample::new(7000.0, 0.9, 4.2, 10.0, 2.0);
        let mut basis = exact_basis(0.6, 1.4, sample.r_km);
        let (_, e_theta, e_phi) = spherical_unit_vectors(0.6, 1.4);
        basis.theta_hat = e_phi;
        basis.phi_from_theta = -e_theta;

        let out = VectorProjector::project(&sample, &basis).unwrap();
        assert_relative_eq!(out.db_theta_th, -2.0, epsilon = 1e-10);
        assert_relative_eq!(out.db_phi_th, 10.0, epsilon = 1e-10);
        // the phi-anchored frame was left alone
        assert_relative_eq!(out.db_theta_ph, 10.0, epsilon = 1e-10);
        assert_relative_eq!(out.db_phi_ph, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_radial_lean_is_dropped() {
        let sample = GeoSample::new(7000.0, 0.9, 4.2, 5.0, 0.0);
        let mut basis = exact_basis(0.6, 1.4, sample.r_km);
        let angle: f64 = 1e-3;
        basis.theta_hat = basis.theta_hat * angle.cos() - basis.r_hat * angle.sin();

        let out = VectorProjector::project(&sample, &basis).unwrap();
        assert_relative_eq!(out.db_theta_th, 5.0 * angle.cos(), epsilon = 1e-12);
        assert_relative_eq!(out.db_phi_th, 0.0, epsilon = 1e-12);
    }
}
