//! CLI-specific error types

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::forms::FormError;
use crate::schema::ValidationFailure;
use crate::store::StoreError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout/files)
    IoError,
    /// Unknown or broken form
    FormError,
    /// Unreadable fixture file
    FixtureError,
    /// The payload was rejected
    Rejected,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "PARAM_CLI_CONFIG_ERROR",
            Self::IoError => "PARAM_CLI_IO_ERROR",
            Self::FormError => "PARAM_CLI_FORM_ERROR",
            Self::FixtureError => "PARAM_CLI_FIXTURE_ERROR",
            Self::Rejected => "PARAM_CLI_REJECTED",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
#[error("{}: {}", .code.code(), .message)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn fixture_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::FixtureError, msg)
    }

    /// The payload failed validation; the report was already written.
    pub fn rejected(failure: &ValidationFailure) -> Self {
        Self::new(CliErrorCode::Rejected, failure.to_string())
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<FormError> for CliError {
    fn from(e: FormError) -> Self {
        Self::new(CliErrorCode::FormError, e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::fixture_error(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
