//! Connection endpoint parsing
//!
//! Accepted forms:
//! - `memory://` or `memory://<name>`
//! - `file://<directory>`
//! - `mongodb://...` and `mongodb+srv://...`

use std::fmt;
use std::path::PathBuf;

use crate::adapter::{AdapterError, AdapterResult};

/// Name used by `memory://` without a name
const DEFAULT_MEMORY_NAME: &str = "default";

/// A parsed store endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Process-local collections registered under a name
    Memory(String),
    /// Collection files under a root directory
    File(PathBuf),
    /// MongoDB connection string, passed to the driver unchanged
    Mongo(String),
}

impl Endpoint {
    /// Parse an endpoint string.
    ///
    /// # Errors
    ///
    /// `AdapterError::Configuration` for an empty string, an unknown scheme or
    /// a `file://` endpoint without a directory.
    pub fn parse(uri: &str) -> AdapterResult<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(AdapterError::Configuration(
                "store endpoint is empty".to_string(),
            ));
        }

        if let Some(name) = uri.strip_prefix("memory://") {
            let name = if name.is_empty() {
                DEFAULT_MEMORY_NAME
            } else {
                name
            };
            return Ok(Endpoint::Memory(name.to_string()));
        }

        if let Some(path) = uri.strip_prefix("file://") {
            if path.is_empty() {
                return Err(AdapterError::Configuration(
                    "file endpoint requires a directory".to_string(),
                ));
            }
            return Ok(Endpoint::File(PathBuf::from(path)));
        }

        if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
            return Ok(Endpoint::Mongo(uri.to_string()));
        }

        Err(AdapterError::Configuration(format!(
            "unsupported store endpoint: {}",
            uri
        )))
    }

    /// Scheme label for logs
    pub fn scheme(&self) -> &'static str {
        match self {
            Endpoint::Memory(_) => "memory",
            Endpoint::File(_) => "file",
            Endpoint::Mongo(_) => "mongodb",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Memory(name) => write!(f, "memory://{}", name),
            Endpoint::File(path) => write!(f, "file://{}", path.display()),
            // connection strings may carry credentials
            Endpoint::Mongo(_) => write!(f, "mongodb://<redacted>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory() {
        assert_eq!(
            Endpoint::parse("memory://casbin").unwrap(),
            Endpoint::Memory("casbin".to_string())
        );
        assert_eq!(
            Endpoint::parse("memory://").unwrap(),
            Endpoint::Memory("default".to_string())
        );
    }

    #[test]
    fn test_parse_file() {
        assert_eq!(
            Endpoint::parse("file:///var/lib/policies").unwrap(),
            Endpoint::File(PathBuf::from("/var/lib/policies"))
        );
        assert!(Endpoint::parse("file://").is_err());
    }

    #[test]
    fn test_parse_mongo() {
        let endpoint = Endpoint::parse("mongodb+srv://user:pw@cluster0.example.net").unwrap();
        assert_eq!(endpoint.scheme(), "mongodb");
        assert!(!endpoint.to_string().contains("pw"));
    }

    #[test]
    fn test_parse_rejects_unknown_scheme() {
        let err = Endpoint::parse("postgres://localhost").unwrap_err();
        assert!(matches!(err, AdapterError::Configuration(_)));
        assert!(Endpoint::parse("   ").is_err());
    }
}
