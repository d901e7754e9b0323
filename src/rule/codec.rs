//! Rule <-> document conversion
//!
//! Document layout:
//!
//! ```text
//! { "ptype": "p", "v0": "alice", "v1": "data1", "v2": "read", "v3": "", "v4": "", "v5": "" }
//! ```
//!
//! Keys other than these seven (a store-assigned `_id`, for example) are
//! ignored on decode.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::adapter::{AdapterError, AdapterResult};
use crate::store::Document;

/// Maximum number of positional fields a rule may carry
pub const MAX_FIELDS: usize = 6;

/// Document key holding the policy type tag
pub const PTYPE_FIELD: &str = "ptype";

/// Document keys of the positional slots, in order
pub const FIELD_NAMES: [&str; MAX_FIELDS] = ["v0", "v1", "v2", "v3", "v4", "v5"];

/// A policy rule as the model sees it: a type tag and its ordered fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Policy type tag (`p`, `g`, `g2`, ...)
    pub ptype: String,
    /// Positional fields, never more than [`MAX_FIELDS`] once encoded
    pub fields: Vec<String>,
}

impl PolicyRule {
    /// Create a rule from a tag and its fields
    pub fn new(ptype: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            ptype: ptype.into(),
            fields,
        }
    }

    /// Create a rule from string slices
    pub fn from_strs(ptype: &str, fields: &[&str]) -> Self {
        Self::new(ptype, fields.iter().map(|f| f.to_string()).collect())
    }

    /// Number of positional fields
    pub fn arity(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ptype)?;
        for field in &self.fields {
            write!(f, ", {}", field)?;
        }
        Ok(())
    }
}

/// Fixed-width stored form of a rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleDocument {
    ptype: String,
    slots: [String; MAX_FIELDS],
}

impl RuleDocument {
    /// Encode a rule, padding unused slots with the empty string.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Arity` when the rule has more than six fields.
    pub fn from_rule<S: AsRef<str>>(ptype: &str, fields: &[S]) -> AdapterResult<Self> {
        if fields.len() > MAX_FIELDS {
            return Err(AdapterError::Arity(fields.len()));
        }

        let mut slots: [String; MAX_FIELDS] = Default::default();
        for (slot, field) in slots.iter_mut().zip(fields) {
            *slot = field.as_ref().to_string();
        }

        Ok(Self {
            ptype: ptype.to_string(),
            slots,
        })
    }

    /// Decode a raw store document.
    ///
    /// Returns `Ok(None)` for documents without a `ptype`; those cannot be
    /// rules and are skipped by the load path. Missing or null positional keys
    /// decode as empty slots.
    pub fn from_document(document: &Document) -> AdapterResult<Option<Self>> {
        let ptype = match document.get(PTYPE_FIELD) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(AdapterError::Decode(format!(
                    "{} must be a string, found {}",
                    PTYPE_FIELD, other
                )))
            }
        };

        let mut slots: [String; MAX_FIELDS] = Default::default();
        for (slot, name) in slots.iter_mut().zip(FIELD_NAMES) {
            match document.get(name) {
                None | Some(Value::Null) => {}
                Some(Value::String(s)) => *slot = s.clone(),
                Some(other) => {
                    return Err(AdapterError::Decode(format!(
                        "{} must be a string, found {}",
                        name, other
                    )))
                }
            }
        }

        Ok(Some(Self { ptype, slots }))
    }

    /// Policy type tag
    pub fn ptype(&self) -> &str {
        &self.ptype
    }

    /// All six slots, padded
    pub fn slots(&self) -> &[String; MAX_FIELDS] {
        &self.slots
    }

    /// Full seven-field document
    pub fn to_document(&self) -> Document {
        let mut document = self.positional_document();
        document.insert(PTYPE_FIELD.to_string(), Value::String(self.ptype.clone()));
        document
    }

    /// The six positional fields only; the tag is left out.
    pub fn positional_document(&self) -> Document {
        let mut document = Map::with_capacity(MAX_FIELDS + 1);
        for (name, value) in FIELD_NAMES.iter().zip(&self.slots) {
            document.insert(name.to_string(), Value::String(value.clone()));
        }
        document
    }

    /// Back to a rule with trailing empty slots dropped
    pub fn into_rule(self) -> PolicyRule {
        let mut fields = Vec::from(self.slots);
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        PolicyRule {
            ptype: self.ptype,
            fields,
        }
    }
}
