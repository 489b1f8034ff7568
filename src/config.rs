//! Engine configuration, persisted as TOML.
//!
//! ```toml
//! namespace = "rulebook.samples.equivalence"
//! disabled_rules = ["fact-equivalence"]
//! ```

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or saving engine configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read engine config: {path}")]
    #[diagnostic(
        code(rulebook::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse engine config: {path}: {message}")]
    #[diagnostic(
        code(rulebook::config::parse),
        help("Check the TOML syntax. Expected keys: `namespace` and optional `disabled_rules`.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write engine config: {path}")]
    #[diagnostic(
        code(rulebook::config::write),
        help("Check that the parent directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Configuration for an [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Namespace whose rules the engine discovers.
    #[serde(default)]
    pub namespace: String,
    /// Rule names dropped from the list when it is populated.
    #[serde(default)]
    pub disabled_rules: Vec<String>,
}

impl EngineConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, "<inline>")
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    fn parse(content: &str, origin: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }
}
