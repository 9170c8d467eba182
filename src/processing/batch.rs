//! Batch transport of independent samples under one epoch
//!
//! Each sample walks `Pending → ConvertingBase → ConvertingTheta →
//! ConvertingPhi → Projecting → Done`, or stops in `Failed(stage)`. A failed
//! sample never stops the batch; the failure is recorded against its index.

use rayon::prelude::*;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::algorithms::local_frame::{LocalFrameBuilder, Perturbation};
use crate::algorithms::projection::VectorProjector;
use crate::converter::{ConversionMode, ConversionResult, PointConverter};
use crate::core::{EpochContext, EpochError, GeoSample, MagneticPoint, OutputSample};
use crate::utils::config::{validate_config, ConfigError, TransportConfig};
use crate::validation::error::{Stage, TransportError, TransportResult};

/// Progress of one sample through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SampleState {
    Pending,
    ConvertingBase,
    ConvertingTheta,
    ConvertingPhi,
    Projecting,
    Done,
    Failed(Stage),
}

impl SampleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SampleState::Done | SampleState::Failed(_))
    }

    /// Stage a failure in this state is attributed to
    fn failure_stage(&self) -> Stage {
        match self {
            SampleState::Pending | SampleState::ConvertingBase => Stage::Base,
            SampleState::ConvertingTheta => Stage::ThetaPerturb,
            SampleState::ConvertingPhi => Stage::PhiPerturb,
            SampleState::Projecting | SampleState::Done => Stage::Projection,
            SampleState::Failed(stage) => *stage,
        }
    }
}

/// A sample that did not reach `Done`
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFailure {
    pub index: usize,
    pub stage: Stage,
    pub error: TransportError,
}

impl SampleFailure {
    pub fn code(&self) -> u32 {
        self.error.code()
    }
}

/// Serializable per-sample record for reports
#[derive(Debug, Clone, Serialize)]
pub struct SampleRecord {
    pub index: usize,
    pub state: SampleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Results of a batch, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    results: Vec<Result<OutputSample, SampleFailure>>,
    states: Vec<SampleState>,
}

impl BatchOutcome {
    fn from_pairs(pairs: Vec<(SampleState, Result<OutputSample, SampleFailure>)>) -> Self {
        let (states, results) = pairs.into_iter().unzip();
        Self { results, states }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Result<OutputSample, SampleFailure>> {
        self.results.get(index)
    }

    pub fn results(&self) -> &[Result<OutputSample, SampleFailure>] {
        &self.results
    }

    pub fn states(&self) -> &[SampleState] {
        &self.states
    }

    pub fn state(&self, index: usize) -> Option<SampleState> {
        self.states.get(index).copied()
    }

    /// Successful outputs with their sample index
    pub fn successes(&self) -> impl Iterator<Item = (usize, &OutputSample)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().ok().map(|out| (i, out)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &SampleFailure> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    pub fn to_records(&self) -> Vec<SampleRecord> {
        self.results
            .iter()
            .zip(&self.states)
            .enumerate()
            .map(|(index, (result, state))| match result {
                Ok(output) => SampleRecord {
                    index,
                    state: *state,
                    output: Some(*output),
                    error_code: None,
                    message: None,
                },
                Err(failure) => SampleRecord {
                    index,
                    state: *state,
                    output: None,
                    error_code: Some(failure.code()),
                    message: Some(failure.error.to_string()),
                },
            })
            .collect()
    }
}

/// Funnels concurrent calls into a non-reentrant converter through one lock
struct SerializedConverter<'a, C: ?Sized> {
    inner: &'a C,
    lock: Mutex<()>,
}

impl<'a, C: PointConverter + ?Sized> PointConverter for SerializedConverter<'a, C> {
    fn convert_point(
        &self,
        epoch: &EpochContext,
        lat_deg: f64,
        lon_deg: f64,
        height_km: f64,
        mode: ConversionMode,
    ) -> ConversionResult<MagneticPoint> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.inner.convert_point(epoch, lat_deg, lon_deg, height_km, mode)
    }

    fn is_reentrant(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Runs vector transport over batches of samples
pub struct BatchDriver<C> {
    converter: C,
    config: TransportConfig,
    epoch: Option<EpochContext>,
}

impl<C: PointConverter> BatchDriver<C> {
    pub fn new(converter: C) -> Self {
        Self {
            converter,
            config: TransportConfig::default(),
            epoch: None,
        }
    }

    pub fn with_config(converter: C, config: TransportConfig) -> Result<Self, ConfigError> {
        let validation = validate_config(&config);
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error);
        }
        for warning in &validation.warnings {
            warn!("{}", warning);
        }

        Ok(Self {
            converter,
            config,
            epoch: None,
        })
    }

    /// Set the epoch for subsequent batches after the converter accepts it
    pub fn set_epoch(&mut self, epoch: EpochContext) -> Result<(), EpochError> {
        self.converter.check_epoch(&epoch)?;
        info!(epoch = %epoch.datetime(), converter = self.converter.name(), "epoch set");
        self.epoch = Some(epoch);
        Ok(())
    }

    pub fn epoch(&self) -> Option<&EpochContext> {
        self.epoch.as_ref()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Transport every sample, isolating failures per sample
    pub fn run(&self, samples: &[GeoSample]) -> BatchOutcome {
        let started = Instant::now();

        let outcome = match &self.epoch {
            None => {
                warn!(samples = samples.len(), "batch run without an epoch; every sample fails");
                BatchOutcome::from_pairs(
                    (0..samples.len())
                        .map(|index| {
                            let stage = Stage::Base;
                            let failure = SampleFailure {
                                index,
                                stage,
                                error: TransportError::EpochNotSet,
                            };
                            (SampleState::Failed(stage), Err(failure))
                        })
                        .collect(),
                )
            }
            Some(epoch) if self.config.parallel => self.run_parallel(epoch, samples),
            Some(epoch) => BatchOutcome::from_pairs(
                samples
                    .iter()
                    .enumerate()
                    .map(|(index, sample)| self.process_sample(&self.converter, epoch, index, sample))
                    .collect(),
            ),
        };

        info!(
            samples = outcome.len(),
            succeeded = outcome.success_count(),
            failed = outcome.failure_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch complete"
        );
        outcome
    }

    fn run_parallel(&self, epoch: &EpochContext, samples: &[GeoSample]) -> BatchOutcome {
        if self.converter.is_reentrant() {
            self.run_in_pool(&self.converter, epoch, samples)
        } else {
            debug!(converter = self.converter.name(), "serializing calls into non-reentrant converter");
            let serialized = SerializedConverter {
                inner: &self.converter,
                lock: Mutex::new(()),
            };
            self.run_in_pool(&serialized, epoch, samples)
        }
    }

    fn run_in_pool<P: PointConverter + ?Sized>(
        &self,
        converter: &P,
        epoch: &EpochContext,
        samples: &[GeoSample],
    ) -> BatchOutcome {
        let work = || -> Vec<_> {
            samples
                .par_iter()
                .enumerate()
                .map(|(index, sample)| self.process_sample(converter, epoch, index, sample))
                .collect()
        };

        let pairs = match self.config.worker_threads {
            Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(work),
                Err(e) => {
                    warn!(threads, error = %e, "could not build worker pool, using global pool");
                    work()
                }
            },
            None => work(),
        };

        BatchOutcome::from_pairs(pairs)
    }

    /// Run one sample through every stage
    pub fn process_sample<P: PointConverter + ?Sized>(
        &self,
        converter: &P,
        epoch: &EpochContext,
        index: usize,
        sample: &GeoSample,
    ) -> (SampleState, Result<OutputSample, SampleFailure>) {
        let builder = LocalFrameBuilder::from_config(converter, epoch, &self.config);
        let mut state = SampleState::Pending;

        match Self::advance(&builder, sample, &mut state) {
            Ok(output) => {
                debug!(index, "sample transported");
                (SampleState::Done, Ok(output))
            }
            Err(error) => {
                let stage = error.stage().unwrap_or_else(|| state.failure_stage());
                warn!(index, stage = %stage, code = error.code(), error = %error, "sample failed");
                (SampleState::Failed(stage), Err(SampleFailure { index, stage, error }))
            }
        }
    }

    fn advance<P: PointConverter + ?Sized>(
        builder: &LocalFrameBuilder<'_, P>,
        sample: &GeoSample,
        state: &mut SampleState,
    ) -> TransportResult<OutputSample> {
        sample.validate()?;

        *state = SampleState::ConvertingBase;
        let base = builder.convert_base(sample)?;

        *state = SampleState::ConvertingTheta;
        let theta_point = builder.convert_perturbed(sample, Perturbation::Theta)?;

        *state = SampleState::ConvertingPhi;
        let phi_point = builder.convert_perturbed(sample, Perturbation::Phi)?;

        *state = SampleState::Projecting;
        let basis = builder.assemble(sample, base, theta_point, phi_point)?;
        VectorProjector::project(sample, &basis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::mock::{RotationConverter, ScriptedConverter};
    use crate::converter::{ConversionError, DipoleConverter};
    use crate::core::EARTH_RADIUS_KM;

    fn epoch() -> EpochContext {
        EpochContext::new(2015, 3, 17, 4, 30, 0).unwrap()
    }

    fn samples() -> Vec<GeoSample> {
        vec![
            GeoSample::from_geodetic(45.5, -23.5, 1135.0, 25.0, -12.0, EARTH_RADIUS_KM),
            GeoSample::from_geodetic(-62.0, 140.0, 800.0, -3.0, 44.0, EARTH_RADIUS_KM),
            GeoSample::from_geodetic(71.2, 10.0, 110.0, 150.0, 90.0, EARTH_RADIUS_KM),
            GeoSample::from_geodetic(30.0, 250.0, 500.0, 0.0, 0.0, EARTH_RADIUS_KM),
        ]
    }

    #[test]
    fn test_all_samples_done() {
        let mut driver = BatchDriver::new(DipoleConverter::new());
        driver.set_epoch(epoch()).unwrap();

        let outcome = driver.run(&samples());
        assert_eq!(outcome.len(), 4);
        assert_eq!(outcome.success_count(), 4);
        assert!(outcome.states().iter().all(|s| *s == SampleState::Done));
    }

    #[test]
    fn test_theta_failure_isolated() {
        // call 2 is the theta-perturbed point of the first sample
        let converter = ScriptedConverter::new(RotationConverter::from_pole(80.4, -72.6))
            .fail_on_call(2, ConversionError::NoConvergence);
        let mut driver = BatchDriver::new(converter);
        driver.set_epoch(epoch()).unwrap();

        let outcome = driver.run(&samples()[..2]);

        let failure = outcome.get(0).unwrap().as_ref().unwrap_err();
        assert_eq!(failure.index, 0);
        assert_eq!(failure.stage, Stage::ThetaPerturb);
        assert_eq!(failure.code(), 1501);
        assert_eq!(
            failure.error,
            TransportError::ConversionFailure {
                stage: Stage::ThetaPerturb,
                cause: ConversionError::NoConvergence
            }
        );
        assert_eq!(outcome.state(0), Some(SampleState::Failed(Stage::ThetaPerturb)));
        assert_eq!(outcome.state(1), Some(SampleState::Done));
        // the failed sample stops after two calls, the next one needs three
        assert_eq!(driver.converter().calls(), 5);
    }

    #[test]
    fn test_missing_epoch_fails_every_sample() {
        let converter = ScriptedConverter::new(RotationConverter::identity());
        let driver = BatchDriver::new(converter);

        let outcome = driver.run(&samples());
        assert_eq!(outcome.failure_count(), 4);
        assert!(outcome.failures().all(|f| f.error == TransportError::EpochNotSet && f.code() == 1504));
        assert_eq!(driver.converter().calls(), 0);
    }

    #[test]
    fn test_epoch_rejected_by_converter() {
        let mut driver = BatchDriver::new(DipoleConverter::new());
        let old = EpochContext::new(1960, 1, 1, 0, 0, 0).unwrap();

        assert!(matches!(driver.set_epoch(old), Err(EpochError::OutOfRange { .. })));
        assert!(driver.epoch().is_none());
    }

    #[test]
    fn test_invalid_sample_recorded() {
        let mut driver = BatchDriver::new(RotationConverter::identity());
        driver.set_epoch(epoch()).unwrap();

        let mut batch = samples();
        batch[2].r_km = f64::NAN;
        let outcome = driver.run(&batch);

        let failure = outcome.failures().next().unwrap();
        assert_eq!(failure.index, 2);
        assert_eq!(failure.stage, Stage::Base);
        assert_eq!(failure.code(), 1505);
        assert_eq!(outcome.success_count(), 3);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut sequential = BatchDriver::new(DipoleConverter::new());
        sequential.set_epoch(epoch()).unwrap();

        let config = TransportConfig::default().with_parallel(true).with_worker_threads(3);
        let mut parallel = BatchDriver::with_config(DipoleConverter::new(), config).unwrap();
        parallel.set_epoch(epoch()).unwrap();

        let batch = samples();
        assert_eq!(sequential.run(&batch), parallel.run(&batch));
    }

    #[test]
    fn test_parallel_serializes_non_reentrant_converter() {
        let config = TransportConfig::default().with_parallel(true);
        let converter = ScriptedConverter::new(RotationConverter::from_pole(80.4, -72.6));
        let mut driver = BatchDriver::with_config(converter, config).unwrap();
        driver.set_epoch(epoch()).unwrap();

        let batch: Vec<GeoSample> = (0..32)
            .map(|i| GeoSample::from_geodetic(-60.0 + 4.0 * i as f64, 7.0 * i as f64, 400.0, 1.0, 2.0, EARTH_RADIUS_KM))
            .collect();
        let outcome = driver.run(&batch);

        assert_eq!(outcome.success_count(), 32);
        assert_eq!(driver.converter().calls(), 96);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TransportConfig::default().with_step_km(-1.0);
        assert!(BatchDriver::with_config(DipoleConverter::new(), config).is_err());
    }

    #[test]
    fn test_records_report_failures() {
        let converter = ScriptedConverter::new(RotationConverter::identity())
            .fail_on_call(1, ConversionError::NoConvergence);
        let mut driver = BatchDriver::new(converter);
        driver.set_epoch(epoch()).unwrap();

        let records = driver.run(&samples()[..2]).to_records();
        assert_eq!(records[0].error_code, Some(1500));
        assert!(records[0].output.is_none());
        assert!(records[1].output.is_some());

        let json = serde_json::to_string(&records).unwrap();
        assert!(json.contains("\"Failed\":\"Base\""));
    }
}
