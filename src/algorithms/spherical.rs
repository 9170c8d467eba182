//! Spherical/Cartesian conversions for positions and vector components
//!
//! Physics convention throughout: colatitude measured from the +z axis,
//! longitude measured in the x-y plane from +x toward +y. Vector components
//! are ordered (radial, theta, phi) where theta points southward and phi
//! eastward.

use nalgebra::Vector3;
use std::f64::consts::TAU;

use crate::core::DEGENERATE_LENGTH;
use crate::validation::error::{TransportError, TransportResult};

/// Wrap a longitude in degrees into [0, 360)
pub fn normalize_longitude_deg(lon_deg: f64) -> f64 {
    let wrapped = lon_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Unit vectors (r̂, θ̂, φ̂) of the local spherical basis at a direction
pub fn spherical_unit_vectors(colat_rad: f64, lon_rad: f64) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let (sin_t, cos_t) = colat_rad.sin_cos();
    let (sin_p, cos_p) = lon_rad.sin_cos();

    let e_r = Vector3::new(sin_t * cos_p, sin_t * sin_p, cos_t);
    let e_theta = Vector3::new(cos_t * cos_p, cos_t * sin_p, -sin_t);
    let e_phi = Vector3::new(-sin_p, cos_p, 0.0);

    (e_r, e_theta, e_phi)
}

pub fn spherical_to_cartesian(r: f64, colat_rad: f64, lon_rad: f64) -> Vector3<f64> {
    let (e_r, _, _) = spherical_unit_vectors(colat_rad, lon_rad);
    e_r * r
}

/// Inverse of [`spherical_to_cartesian`]; longitude returned in [0, 2π)
pub fn cartesian_to_spherical(position: &Vector3<f64>) -> TransportResult<(f64, f64, f64)> {
    let r = position.norm();
    if r < DEGENERATE_LENGTH {
        return Err(TransportError::DegenerateVector {
            context: "cartesian position",
        });
    }

    let colat = (position.z / r).clamp(-1.0, 1.0).acos();
    let mut lon = position.y.atan2(position.x);
    if lon < 0.0 {
        lon += TAU;
    }
    if lon >= TAU {
        lon = 0.0;
    }

    Ok((r, colat, lon))
}

/// Rotate (Br, Bθ, Bφ) at a direction into global Cartesian components
pub fn spherical_vector_to_cartesian(colat_rad: f64, lon_rad: f64, br: f64, bth: f64, bph: f64) -> Vector3<f64> {
    let (e_r, e_theta, e_phi) = spherical_unit_vectors(colat_rad, lon_rad);
    e_r * br + e_theta * bth + e_phi * bph
}

/// Components (Br, Bθ, Bφ) of a Cartesian vector in the local basis at `position`
pub fn cartesian_vector_to_spherical(position: &Vector3<f64>, v: &Vector3<f64>) -> TransportResult<(f64, f64, f64)> {
    let (_, colat, lon) = cartesian_to_spherical(position)?;
    let (e_r, e_theta, e_phi) = spherical_unit_vectors(colat, lon);

    Ok((v.dot(&e_r), v.dot(&e_theta), v.dot(&e_phi)))
}

/// Unit vector along `v`, failing when `v` has no usable length
pub fn normalize(v: &Vector3<f64>, context: &'static str) -> TransportResult<Vector3<f64>> {
    v.try_normalize(DEGENERATE_LENGTH)
        .ok_or(TransportError::DegenerateVector { context })
}
