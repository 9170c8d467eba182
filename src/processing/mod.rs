//! Batch processing of field samples

pub mod batch;

pub use batch::{BatchDriver, BatchOutcome, SampleFailure, SampleRecord, SampleState};
