//! # Adapter Errors

use thiserror::Error;

use crate::store::StoreError;

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Adapter errors
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    // Construction
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Rule shape
    #[error("Rule has {0} fields (max: 6)")]
    Arity(usize),

    #[error("Field index out of range: {0}")]
    FieldIndex(usize),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Stored document is not a rule: {0}")]
    Decode(String),

    #[error("Batch size mismatch: {old} old rules, {new} new rules")]
    BatchMismatch { old: usize, new: usize },

    // Store
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdapterError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::Configuration(_) => "ADAPTER_CONFIGURATION",
            AdapterError::Arity(_) => "ADAPTER_ARITY",
            AdapterError::FieldIndex(_) => "ADAPTER_FIELD_INDEX",
            AdapterError::InvalidFilter(_) => "ADAPTER_INVALID_FILTER",
            AdapterError::Decode(_) => "ADAPTER_DECODE",
            AdapterError::BatchMismatch { .. } => "ADAPTER_BATCH_MISMATCH",
            AdapterError::Store(e) => e.code(),
        }
    }

    /// Whether the error came from the store rather than the caller's input
    pub fn is_store(&self) -> bool {
        matches!(self, AdapterError::Store(_))
    }
}
