//! Document store errors
//!
//! Every variant is surfaced to the adapter's caller untouched; the adapter
//! never retries.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a document store backend
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Disk or transport I/O failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Stored record failed checksum or framing verification
    #[error("Corrupted record at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    /// Query uses an operator the local matcher does not implement
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    /// Error reported by a remote database driver
    #[error("Backend error: {0}")]
    Backend(String),

    /// Store answered a command with a reply of the wrong kind
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A lock guarding the collection was poisoned by a panicking writer
    #[error("Collection lock poisoned")]
    Poisoned,

    /// Background task running the command did not complete
    #[error("Store task interrupted: {0}")]
    Interrupted(String),
}

impl StoreError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Io(_) => "STORE_IO_ERROR",
            StoreError::Corruption { .. } => "STORE_DATA_CORRUPTION",
            StoreError::UnsupportedQuery(_) => "STORE_UNSUPPORTED_QUERY",
            StoreError::Backend(_) => "STORE_BACKEND_ERROR",
            StoreError::Protocol(_) => "STORE_PROTOCOL_ERROR",
            StoreError::Poisoned => "STORE_LOCK_POISONED",
            StoreError::Interrupted(_) => "STORE_INTERRUPTED",
        }
    }

    /// Create an unsupported-query error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        StoreError::UnsupportedQuery(msg.into())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

#[cfg(feature = "mongo")]
impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}
