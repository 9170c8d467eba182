//! Error types for sample transport

pub mod error;

pub use error::{Stage, TransportError, TransportResult};
