//! CLI-specific error types

use std::fmt;
use std::io;

use crate::adapter::AdapterError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file or endpoint error
    ConfigError,
    /// I/O error (files, stdout)
    IoError,
    /// Malformed command input (policy line, raw query)
    InvalidInput,
    /// Adapter operation failed
    AdapterFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "POLICY_CLI_CONFIG_ERROR",
            Self::IoError => "POLICY_CLI_IO_ERROR",
            Self::InvalidInput => "POLICY_CLI_INVALID_INPUT",
            Self::AdapterFailed => "POLICY_CLI_ADAPTER_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Invalid input
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

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

impl From<AdapterError> for CliError {
    fn from(e: AdapterError) -> Self {
        let code = match e {
            AdapterError::Configuration(_) => CliErrorCode::ConfigError,
            AdapterError::Arity(_)
            | AdapterError::FieldIndex(_)
            | AdapterError::InvalidFilter(_)
            | AdapterError::BatchMismatch { .. } => CliErrorCode::InvalidInput,
            AdapterError::Decode(_) | AdapterError::Store(_) => CliErrorCode::AdapterFailed,
        };
        Self::new(code, format!("{} ({})", e, e.code()))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
