//! Engine configuration
//!
//! Loaded from a JSON file. Every field is optional and falls back to the
//! documented default, so an empty object `{}` is a valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default maximum nesting depth for nested schemas.
pub const DEFAULT_MAX_LEVEL: usize = 2;

/// Status code carried by validation failures (Unprocessable Entity).
pub const DEFAULT_STATUS_CODE: u16 = 422;

/// Default top-level message for a failed validation.
pub const DEFAULT_FAILURE_MESSAGE: &str =
    "Please check the 'errors' for the list of validation errors";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid config value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum nesting depth for nested schemas (default 2)
    #[serde(default = "default_max_level")]
    pub max_level: usize,

    /// Top-level message of a validation failure
    #[serde(default = "default_failure_message")]
    pub failure_message: String,

    /// Status code of a validation failure (default 422)
    #[serde(default = "default_status_code")]
    pub status_code: u16,

    /// Log filter directive used by the CLI (default "info")
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_max_level() -> usize {
    DEFAULT_MAX_LEVEL
}

fn default_failure_message() -> String {
    DEFAULT_FAILURE_MESSAGE.to_string()
}

fn default_status_code() -> u16 {
    DEFAULT_STATUS_CODE
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_level: default_max_level(),
            failure_message: default_failure_message(),
            status_code: default_status_code(),
            log_filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: EngineConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_level == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_level",
                reason: "must be at least 1".into(),
            });
        }
        if !(400..=599).contains(&self.status_code) {
            return Err(ConfigError::InvalidValue {
                field: "status_code",
                reason: format!("{} is not an error status", self.status_code),
            });
        }
        if self.failure_message.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "failure_message",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}
