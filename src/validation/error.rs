use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::converter::ConversionError;

/// Step of the per-sample pipeline an error is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Conversion of the sample position itself
    Base,
    /// Conversion of the theta-perturbed position
    ThetaPerturb,
    /// Conversion of the phi-perturbed position
    PhiPerturb,
    /// Basis construction and projection
    Projection,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Base => "BASE",
            Stage::ThetaPerturb => "THETA_PERTURB",
            Stage::PhiPerturb => "PHI_PERTURB",
            Stage::Projection => "PROJECTION",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while transporting a single sample
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// A zero-length vector was asked for a direction
    #[error("degenerate vector: {context} has no direction")]
    DegenerateVector { context: &'static str },

    /// The point converter rejected one of the three points
    #[error("point conversion failed at {stage}: {cause}")]
    ConversionFailure {
        stage: Stage,
        #[source]
        cause: ConversionError,
    },

    /// No epoch configured before the batch ran
    #[error("no epoch set before conversion")]
    EpochNotSet,

    /// Input sample cannot be placed on a sphere
    #[error("invalid sample: {reason}")]
    InvalidSample { reason: String },
}

impl TransportError {
    /// Numeric code, compatible with the legacy 1500/1501/1502 return values
    pub fn code(&self) -> u32 {
        match self {
            TransportError::ConversionFailure { stage, .. } => match stage {
                Stage::Base => 1500,
                Stage::ThetaPerturb => 1501,
                Stage::PhiPerturb => 1502,
                Stage::Projection => 1503,
            },
            TransportError::DegenerateVector { .. } => 1503,
            TransportError::EpochNotSet => 1504,
            TransportError::InvalidSample { .. } => 1505,
        }
    }

    /// Stage named by the error, if it names one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            TransportError::ConversionFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Wrap a converter error with the stage that produced it
    pub fn conversion(stage: Stage, cause: ConversionError) -> Self {
        match cause {
            ConversionError::EpochNotSet => TransportError::EpochNotSet,
            cause => TransportError::ConversionFailure { stage, cause },
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
