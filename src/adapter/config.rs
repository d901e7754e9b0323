//! Adapter configuration
//!
//! ```json
//! { "uri": "file:///var/lib/policies", "dbname": "casbin", "collection": "casbin_rule" }
//! ```
//!
//! `uri` may be left out when the adapter is built over an existing client.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{AdapterError, AdapterResult};
use crate::store::Endpoint;

/// Collection used when none is configured
pub const DEFAULT_COLLECTION: &str = "casbin_rule";

/// Construction options for both adapter surfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterOptions {
    /// Store endpoint (`memory://`, `file://`, `mongodb://`)
    #[serde(default)]
    pub uri: Option<String>,

    /// Database name, also accepted as `db_name`
    #[serde(default, alias = "db_name")]
    pub dbname: Option<String>,

    /// Collection holding the rule documents (default: "casbin_rule")
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            uri: None,
            dbname: None,
            collection: default_collection(),
        }
    }
}

impl AdapterOptions {
    /// Options for an endpoint and database
    pub fn new(uri: impl Into<String>, dbname: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            dbname: Some(dbname.into()),
            ..Default::default()
        }
    }

    /// Options for a pre-established client: database only
    pub fn for_client(dbname: impl Into<String>) -> Self {
        Self {
            dbname: Some(dbname.into()),
            ..Default::default()
        }
    }

    /// Override the collection name
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Load options from a JSON file
    pub fn load(path: &Path) -> AdapterResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AdapterError::Configuration(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;

        let options: AdapterOptions = serde_json::from_str(&content)
            .map_err(|e| AdapterError::Configuration(format!("Invalid config JSON: {}", e)))?;

        options.validate()?;

        Ok(options)
    }

    /// Check the options that apply regardless of how the store is reached
    pub fn validate(&self) -> AdapterResult<()> {
        self.database()?;

        if self.collection.trim().is_empty() {
            return Err(AdapterError::Configuration(
                "collection must not be empty".to_string(),
            ));
        }

        if self.uri.is_some() {
            self.endpoint()?;
        }

        Ok(())
    }

    /// Database name; an empty name counts as missing
    pub fn database(&self) -> AdapterResult<&str> {
        match self.dbname.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(AdapterError::Configuration(
                "database name is required (dbname or db_name)".to_string(),
            )),
        }
    }

    /// Parsed store endpoint
    pub fn endpoint(&self) -> AdapterResult<Endpoint> {
        match self.uri.as_deref() {
            Some(uri) => Endpoint::parse(uri),
            None => Err(AdapterError::Configuration(
                "an endpoint uri is required when no client is supplied".to_string(),
            )),
        }
    }
}
