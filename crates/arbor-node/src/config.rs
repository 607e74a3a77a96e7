//! Node configuration.
//!
//! [`NodeConfig::load`] layers three sources, later ones winning:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `ARBOR__*` environment variables, with `__` between nested keys
//!    (e.g. `ARBOR__FORK__CUT_OFF_AGE=20`)

use std::collections::HashMap;
use std::path::Path;

use arbor_core::fork::ForkConfig;
use serde::{Deserialize, Serialize};

use crate::error::NodeError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ARBOR";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Configuration for a node instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Block tree and pending pool settings.
    pub fork: ForkConfig,
    /// Log level filter string (e.g. "info", "debug", "arbor_core=trace").
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            fork: ForkConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl NodeConfig {
    /// Load defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, NodeError> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading variables from `env` instead of the
    /// process environment when it is `Some`.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, NodeError> {
        let mut builder =
            ::config::Config::builder().add_source(::config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(true),
            );
        }

        let loaded: Self = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        loaded.fork.validate()?;
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.fork.cut_off_age, arbor_core::constants::CUT_OFF_AGE);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.log_format, LogFormat::Text);
    }

    #[test]
    fn load_without_sources_is_default() {
        let cfg = NodeConfig::load_with_env(None, no_env()).unwrap();
        assert_eq!(cfg, NodeConfig::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = toml_file(
            "log_level = \"debug\"\nlog_format = \"json\"\n[fork]\ncut_off_age = 4\n",
        );
        let cfg = NodeConfig::load_with_env(Some(file.path()), no_env()).unwrap();
        assert_eq!(cfg.fork.cut_off_age, 4);
        assert_eq!(cfg.fork.max_pending, arbor_core::constants::DEFAULT_MAX_PENDING);
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn env_overrides_file() {
        let file = toml_file("[fork]\ncut_off_age = 4\n");
        let env = HashMap::from([
            ("ARBOR__FORK__CUT_OFF_AGE".to_string(), "7".to_string()),
            ("ARBOR__LOG_LEVEL".to_string(), "warn".to_string()),
        ]);
        let cfg = NodeConfig::load_with_env(Some(file.path()), Some(env)).unwrap();
        assert_eq!(cfg.fork.cut_off_age, 7);
        assert_eq!(cfg.log_level, "warn");
    }

    #[test]
    fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            NodeConfig::load_with_env(Some(&missing), no_env()),
            Err(NodeError::Config(_))
        ));
    }

    #[test]
    fn zero_cut_off_is_invalid() {
        let file = toml_file("[fork]\ncut_off_age = 0\n");
        assert!(matches!(
            NodeConfig::load_with_env(Some(file.path()), no_env()),
            Err(NodeError::InvalidConfig(_))
        ));
    }
}
