//! Tracing subscriber setup.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

use crate::config::LogFormat;
use crate::error::NodeError;

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, takes precedence over `level`.
/// Fails if a global subscriber is already installed.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), NodeError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let result: Result<(), TryInitError> = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init(),
    };
    result.map_err(|e| NodeError::Logging(e.to_string()))
}
