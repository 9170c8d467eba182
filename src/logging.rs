//! Logging setup for the command-line tool
//!
//! Console output only, written to stderr so that results on stdout stay
//! machine-readable. The level comes from `RUST_LOG` when set.

use std::io;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `default_directive` applies when `RUST_LOG` is unset or unparsable,
/// e.g. `"info"` or `"aacgm_vector=debug"`.
pub fn init_logging(default_directive: &str) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
}
