//! Errors raised while starting a node.
use thiserror::Error;

use arbor_core::error::{ArborError, ConfigError};

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("config: {0}")] Config(#[from] ::config::ConfigError),
    #[error("invalid config: {0}")] InvalidConfig(#[from] ConfigError),
    #[error("logging: {0}")] Logging(String),
    #[error(transparent)] Core(#[from] ArborError),
}
