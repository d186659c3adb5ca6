//! Configuration.
//!
//! Values come from, in increasing priority:
//! - built-in defaults
//! - a TOML file passed with `--config`
//! - environment variables (`OPENAPI_GRAPH_*`)
//!
//! ## Example config file
//! ```toml
//! [pipeline]
//! resolve_timeout_ms = 5000
//! max_message_len = 160
//!
//! [layout]
//! origin_x = 0.0
//! origin_y = 0.0
//! row_height = 32.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layout::LayoutConfig;
use crate::pipeline::PipelineConfig;

/// Overrides `pipeline.resolve_timeout_ms`.
pub const ENV_RESOLVE_TIMEOUT_MS: &str = "OPENAPI_GRAPH_RESOLVE_TIMEOUT_MS";
/// Overrides `pipeline.max_message_len`.
pub const ENV_MAX_MESSAGE_LEN: &str = "OPENAPI_GRAPH_MAX_MESSAGE_LEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub layout: LayoutConfig,
}

impl Config {
    /// Read a TOML file. Missing tables and keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, or the given file, with environment overrides applied.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Apply `OPENAPI_GRAPH_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source. Unparseable values are
    /// logged and ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(ms) = parse_var(&lookup, ENV_RESOLVE_TIMEOUT_MS) {
            self.pipeline.resolve_timeout_ms = ms;
        }
        if let Some(len) = parse_var(&lookup, ENV_MAX_MESSAGE_LEN) {
            self.pipeline.max_message_len = len;
        }
        self
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(%key, value = %raw, "ignoring invalid environment override");
            None
        }
    }
}
