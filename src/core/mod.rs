//! Core types and constants for AACGM vector transport

pub mod types;
pub mod constants;
pub mod epoch;

pub use types::*;
pub use constants::*;
pub use epoch::{EpochContext, EpochError};
