//! End-to-end transport checks against analytically known converters

use aacgm_vector::algorithms::spherical::{spherical_unit_vectors, spherical_vector_to_cartesian};
use aacgm_vector::converter::mock::{LongitudeShiftConverter, RotationConverter};
use aacgm_vector::{
    BatchDriver, DipoleConverter, EpochContext, GeoSample, LocalFrameBuilder, OutputSample, SampleState,
    TransportConfig, EARTH_RADIUS_KM,
};
use approx::assert_relative_eq;

fn epoch() -> EpochContext {
    EpochContext::new(2015, 3, 17, 4, 30, 0).unwrap()
}

fn grid() -> Vec<GeoSample> {
    let mut samples = Vec::new();
    for (i, lat) in [-70.0, -35.0, 0.0, 20.5, 55.0, 68.0].iter().enumerate() {
        for (j, lon) in [-170.0, -23.5, 0.0, 95.0, 200.0].iter().enumerate() {
            let height = 100.0 + 150.0 * (i + j) as f64;
            samples.push(GeoSample::from_geodetic(
                *lat,
                *lon,
                height,
                10.0 + i as f64,
                -4.0 + 3.0 * j as f64,
                EARTH_RADIUS_KM,
            ));
        }
    }
    samples
}

fn half_step(sample: &GeoSample, step_km: f64) -> f64 {
    0.5 * (step_km / sample.r_km).atan()
}

#[test]
fn rotation_reproduces_rotated_vector() {
    let converter = RotationConverter::from_pole(80.37, -72.63);
    let mut driver = BatchDriver::new(converter.clone());
    driver.set_epoch(epoch()).unwrap();

    let samples = grid();
    let outcome = driver.run(&samples);
    assert_eq!(outcome.success_count(), samples.len());

    for (index, out) in outcome.successes() {
        let sample = &samples[index];
        let geo = spherical_vector_to_cartesian(sample.colat_rad, sample.lon_rad, 0.0, sample.db_theta, sample.db_phi);
        let expected = converter.rotation() * geo;

        let (_, e_theta, e_phi) = spherical_unit_vectors(out.aacgm_colat_rad, out.aacgm_lon_rad);
        let transported = e_theta * out.db_theta_th + e_phi * out.db_phi_th;

        let scale = geo.norm();
        assert!((transported - expected).norm() < 1e-6 * scale, "sample {}", index);

        // horizontal magnitude survives up to the chord factor
        assert_relative_eq!(out.magnitude_sq_th().sqrt(), scale, max_relative = 1e-6);
        assert_relative_eq!(out.magnitude_sq_ph().sqrt(), scale, max_relative = 1e-6);
    }
}

#[test]
fn longitude_shift_boundary_fixture() {
    let step_km = 1.0;
    let converter = LongitudeShiftConverter::new(17.0);
    let mut driver = BatchDriver::new(converter);
    driver.set_epoch(epoch()).unwrap();

    let sample = GeoSample::from_geodetic(45.5, -23.5, 1135.0, 25.0, -12.0, EARTH_RADIUS_KM);
    let outcome = driver.run(&[sample]);
    let out: &OutputSample = outcome.get(0).unwrap().as_ref().unwrap();

    let c = half_step(&sample, step_km).cos();
    assert_relative_eq!(out.db_theta_th, 25.0 * c, epsilon = 1e-9);
    assert_relative_eq!(out.db_phi_th, -12.0, epsilon = 1e-9);
    assert_relative_eq!(out.db_theta_ph, 25.0, epsilon = 1e-9);
    assert_relative_eq!(out.db_phi_ph, -12.0 * c, epsilon = 1e-9);

    assert_relative_eq!(out.aacgm_colat_rad, 44.5f64.to_radians(), epsilon = 1e-12);
    assert_relative_eq!(out.aacgm_lon_rad, 353.5f64.to_radians(), epsilon = 1e-12);
}

#[test]
fn longitude_always_normalized() {
    // shifts that push raw output below zero and past 360
    for shift in [-400.0, -60.0, 0.0, 190.0, 725.0] {
        let converter = LongitudeShiftConverter::new(shift);
        let epoch = epoch();
        let builder = LocalFrameBuilder::new(&converter, &epoch);

        for sample in grid() {
            let basis = builder.build(&sample).unwrap();
            for point in [basis.base, basis.theta_point, basis.phi_point] {
                assert!((0.0..360.0).contains(&point.mlon_deg), "shift {} gave {}", shift, point.mlon_deg);
            }
        }
    }
}

#[test]
fn bases_are_unit_length_under_dipole() {
    let converter = DipoleConverter::new();
    let epoch = epoch();
    let builder = LocalFrameBuilder::new(&converter, &epoch);

    for sample in grid() {
        let basis = builder.build(&sample).unwrap();
        for v in [
            basis.r_hat,
            basis.theta_hat,
            basis.phi_raw,
            basis.phi_from_theta,
            basis.theta_from_phi,
        ] {
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn repeated_runs_are_bit_identical() {
    let mut driver = BatchDriver::new(DipoleConverter::new());
    driver.set_epoch(epoch()).unwrap();

    let samples = grid();
    let first = driver.run(&samples);
    let second = driver.run(&samples);
    assert_eq!(first, second);
}

#[test]
fn batch_order_does_not_change_results() {
    let mut driver = BatchDriver::new(DipoleConverter::new());
    driver.set_epoch(epoch()).unwrap();

    let samples = grid();
    let forward = driver.run(&samples);

    let mut reversed_samples = samples.clone();
    reversed_samples.reverse();
    let reversed = driver.run(&reversed_samples);

    let n = samples.len();
    for i in 0..n {
        assert_eq!(
            forward.get(i).unwrap().as_ref().ok(),
            reversed.get(n - 1 - i).unwrap().as_ref().ok()
        );
    }
}

#[test]
fn parallel_run_matches_sequential() {
    let samples = grid();

    let mut sequential = BatchDriver::new(DipoleConverter::new());
    sequential.set_epoch(epoch()).unwrap();

    let mut parallel =
        BatchDriver::with_config(DipoleConverter::new(), TransportConfig::default().with_parallel(true)).unwrap();
    parallel.set_epoch(epoch()).unwrap();

    let a = sequential.run(&samples);
    let b = parallel.run(&samples);
    assert_eq!(a, b);
    assert!(b.states().iter().all(|s| *s == SampleState::Done));
}

#[test]
fn smaller_step_moves_toward_exact_transport() {
    let sample = GeoSample::from_geodetic(45.5, -23.5, 1135.0, 25.0, -12.0, EARTH_RADIUS_KM);
    let converter = LongitudeShiftConverter::new(17.0);

    let mut errors = Vec::new();
    for step_km in [10.0, 1.0] {
        let config = TransportConfig::default().with_step_km(step_km);
        let mut driver = BatchDriver::with_config(converter, config).unwrap();
        driver.set_epoch(epoch()).unwrap();

        let outcome = driver.run(&[sample]);
        let out = outcome.get(0).unwrap().as_ref().unwrap();
        errors.push((out.db_theta_th - 25.0).abs());

        let c = half_step(&sample, step_km).cos();
        assert_relative_eq!(out.db_theta_th, 25.0 * c, epsilon = 1e-9);
    }
    // second-order in the step
    assert!(errors[1] < errors[0] / 50.0);
}
