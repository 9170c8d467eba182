//! AACGM Vector Transport
//!
//! Carries horizontal magnetic perturbation vectors from geographic spherical
//! coordinates into AACGM spherical coordinates. The mapping between the two
//! systems comes from an external [`PointConverter`]; local AACGM bases are
//! recovered by finite differences over three converted points per sample.

pub mod core;
pub mod algorithms;
pub mod converter;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod logging;

// Re-export commonly used types
pub use crate::core::{EpochContext, EpochError, GeoSample, MagneticPoint, OutputSample, EARTH_RADIUS_KM};
pub use algorithms::{LocalBasis, LocalFrameBuilder, Perturbation, VectorProjector};
pub use converter::{ConversionError, ConversionMode, DipoleConverter, PointConverter};
pub use processing::{BatchDriver, BatchOutcome, SampleFailure, SampleRecord, SampleState};
pub use validation::{Stage, TransportError, TransportResult};
pub use utils::{ConfigError, ConfigurationManager, TransportConfig};
