//! Point conversion error types

use thiserror::Error;

/// Failures reported by a point converter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Conversion requested before any epoch was configured
    #[error("no date/time epoch configured")]
    EpochNotSet,
    /// Epoch outside the range the model has coefficients for
    #[error("epoch year {year} not covered by the field model")]
    EpochOutOfRange { year: i32 },
    /// Altitude above the coefficient limit without an override flag
    #[error("height {height_km:.1} km exceeds {limit_km:.0} km limit without an override flag")]
    HeightTooHigh { height_km: f64, limit_km: f64 },
    /// The tracer or coefficient evaluation did not converge
    #[error("conversion did not converge")]
    NoConvergence,
    /// Inputs outside the domain of the transform
    #[error("invalid conversion input: {reason}")]
    InvalidInput { reason: String },
}

pub type ConversionResult<T> = Result<T, ConversionError>;
