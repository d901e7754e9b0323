//! Filter expression and query construction

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::adapter::{AdapterError, AdapterResult};
use crate::rule::{FIELD_NAMES, MAX_FIELDS, PTYPE_FIELD};
use crate::store::Query;

/// Structured field filter with an optional raw-query override.
///
/// Each list holds the accepted values of one field: OR within a field, AND
/// across fields. An empty list puts no constraint on its field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub ptype: Vec<String>,
    #[serde(default)]
    pub v0: Vec<String>,
    #[serde(default)]
    pub v1: Vec<String>,
    #[serde(default)]
    pub v2: Vec<String>,
    #[serde(default)]
    pub v3: Vec<String>,
    #[serde(default)]
    pub v4: Vec<String>,
    #[serde(default)]
    pub v5: Vec<String>,
    /// Store query used verbatim when present and non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_query: Option<Value>,
}

/// A filter resolved to the query it stands for
#[derive(Debug, Clone, PartialEq)]
pub enum FilterQuery {
    /// Built from the structured fields
    Structured(Query),
    /// Caller-supplied query
    Raw(Query),
}

impl FilterQuery {
    /// The query to send to the store
    pub fn into_query(self) -> Query {
        match self {
            FilterQuery::Structured(query) | FilterQuery::Raw(query) => query,
        }
    }

    /// True for a caller-supplied query
    pub fn is_raw(&self) -> bool {
        matches!(self, FilterQuery::Raw(_))
    }
}

impl Filter {
    /// Filter with no constraints
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept only these policy types
    pub fn with_ptype<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ptype = values.into_iter().map(Into::into).collect();
        self
    }

    /// Accept only these values at positional field `index`.
    ///
    /// # Errors
    ///
    /// `AdapterError::FieldIndex` when `index` is not below six.
    pub fn with_field<I, S>(mut self, index: usize, values: I) -> AdapterResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slot = self
            .field_mut(index)
            .ok_or(AdapterError::FieldIndex(index))?;
        *slot = values.into_iter().map(Into::into).collect();
        Ok(self)
    }

    /// Use a raw store query instead of the structured fields
    pub fn with_raw_query(mut self, query: Value) -> Self {
        self.raw_query = Some(query);
        self
    }

    /// Accepted values of positional field `index`
    pub fn field(&self, index: usize) -> Option<&[String]> {
        let values = match index {
            0 => &self.v0,
            1 => &self.v1,
            2 => &self.v2,
            3 => &self.v3,
            4 => &self.v4,
            5 => &self.v5,
            _ => return None,
        };
        Some(values)
    }

    fn field_mut(&mut self, index: usize) -> Option<&mut Vec<String>> {
        match index {
            0 => Some(&mut self.v0),
            1 => Some(&mut self.v1),
            2 => Some(&mut self.v2),
            3 => Some(&mut self.v3),
            4 => Some(&mut self.v4),
            5 => Some(&mut self.v5),
            _ => None,
        }
    }

    /// Resolve to a raw or structured query.
    ///
    /// A raw query wins when it is a non-empty object; `null` or `{}` fall
    /// back to the structured fields.
    ///
    /// # Errors
    ///
    /// `AdapterError::InvalidFilter` when the raw query is not an object.
    pub fn resolve(&self) -> AdapterResult<FilterQuery> {
        match &self.raw_query {
            Some(Value::Object(raw)) if !raw.is_empty() => {
                return Ok(FilterQuery::Raw(raw.clone()));
            }
            None | Some(Value::Null) | Some(Value::Object(_)) => {}
            Some(other) => {
                return Err(AdapterError::InvalidFilter(format!(
                    "raw query must be an object, found {}",
                    other
                )))
            }
        }

        let mut query = Query::new();
        add_one_of(&mut query, PTYPE_FIELD, &self.ptype);
        for (index, name) in FIELD_NAMES.iter().enumerate() {
            if let Some(values) = self.field(index) {
                add_one_of(&mut query, name, values);
            }
        }

        Ok(FilterQuery::Structured(query))
    }
}

fn add_one_of(query: &mut Query, field: &str, values: &[String]) {
    if !values.is_empty() {
        query.insert(field.to_string(), json!({ "$in": values }));
    }
}

/// Query for a filtered load
pub fn build(filter: &Filter) -> AdapterResult<Query> {
    let resolved = filter.resolve()?;
    debug!(raw = resolved.is_raw(), "built load query");
    Ok(resolved.into_query())
}

/// Query matching every document
pub fn match_all() -> Query {
    Query::new()
}

/// Query matching exactly one stored rule shape.
///
/// Slots beyond the rule's arity must be empty, so a shorter rule never
/// matches a longer stored one.
pub fn exact_match<S: AsRef<str>>(ptype: &str, fields: &[S]) -> AdapterResult<Query> {
    if fields.len() > MAX_FIELDS {
        return Err(AdapterError::Arity(fields.len()));
    }

    let mut query = Query::new();
    query.insert(PTYPE_FIELD.to_string(), Value::String(ptype.to_string()));
    for (index, name) in FIELD_NAMES.iter().enumerate() {
        let value = fields.get(index).map(|f| f.as_ref()).unwrap_or("");
        query.insert(name.to_string(), Value::String(value.to_string()));
    }

    Ok(query)
}

/// Query for positional removal: `v{start + i} == values[i]`.
///
/// Every value is matched literally, empty strings included. Returns `None`
/// when the values run past `v5`; no stored document can match such a filter.
pub fn prefix_match<S: AsRef<str>>(ptype: &str, start: usize, values: &[S]) -> Option<Query> {
    if start.checked_add(values.len())? > MAX_FIELDS {
        return None;
    }

    let mut query = Query::new();
    query.insert(PTYPE_FIELD.to_string(), Value::String(ptype.to_string()));
    for (offset, value) in values.iter().enumerate() {
        query.insert(
            FIELD_NAMES[start + offset].to_string(),
            Value::String(value.as_ref().to_string()),
        );
    }

    Some(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_all() {
        assert_eq!(build(&Filter::new()).unwrap(), match_all());
    }

    #[test]
    fn test_structured_filter_uses_in() {
        let filter = Filter::new()
            .with_ptype(["p"])
            .with_field(0, ["alice", "bob"])
            .unwrap();

        let query = build(&filter).unwrap();
        assert_eq!(query.len(), 2);
        assert_eq!(query["ptype"], json!({"$in": ["p"]}));
        assert_eq!(query["v0"], json!({"$in": ["alice", "bob"]}));
    }

    #[test]
    fn test_empty_value_sets_add_no_constraint() {
        let filter = Filter::new().with_field(1, Vec::<String>::new()).unwrap();
        assert!(build(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_field_index_out_of_range() {
        let err = Filter::new().with_field(6, ["x"]).unwrap_err();
        assert!(matches!(err, AdapterError::FieldIndex(6)));
        assert!(Filter::new().field(6).is_none());
    }

    #[test]
    fn test_raw_query_takes_precedence() {
        let raw = json!({"ptype": "p", "v0": {"$in": ["alice", "bob"]}});
        let filter = Filter::new()
            .with_ptype(["g"])
            .with_raw_query(raw.clone());

        let resolved = filter.resolve().unwrap();
        assert!(resolved.is_raw());
        assert_eq!(Value::Object(resolved.into_query()), raw);
    }

    #[test]
    fn test_empty_raw_query_falls_back() {
        let filter = Filter::new().with_ptype(["g"]).with_raw_query(json!({}));
        let resolved = filter.resolve().unwrap();
        assert!(!resolved.is_raw());
        assert_eq!(resolved.into_query()["ptype"], json!({"$in": ["g"]}));
    }

    #[test]
    fn test_non_object_raw_query_rejected() {
        let filter = Filter::new().with_raw_query(json!(["ptype", "p"]));
        assert!(matches!(
            filter.resolve().unwrap_err(),
            AdapterError::InvalidFilter(_)
        ));
    }

    #[test]
    fn test_filter_deserializes_from_json() {
        let filter: Filter =
            serde_json::from_value(json!({"ptype": ["p"], "v2": ["read"]})).unwrap();
        assert_eq!(filter.ptype, vec!["p"]);
        assert_eq!(filter.field(2).unwrap().to_vec(), vec!["read"]);
        assert!(filter.raw_query.is_none());
    }

    #[test]
    fn test_exact_match_pads_trailing_slots() {
        let query = exact_match("p", &["alice", "data1"]).unwrap();
        assert_eq!(query.len(), 7);
        assert_eq!(query["v1"], "data1");
        assert_eq!(query["v2"], "");
        assert_eq!(query["v5"], "");
    }

    #[test]
    fn test_exact_match_arity() {
        let fields = ["a", "b", "c", "d", "e", "f", "g"];
        assert!(matches!(
            exact_match("p", &fields).unwrap_err(),
            AdapterError::Arity(7)
        ));
    }

    #[test]
    fn test_prefix_match_offsets_fields() {
        let query = prefix_match("g", 1, &["data2_admin"]).unwrap();
        assert_eq!(query.len(), 2);
        assert_eq!(query["ptype"], "g");
        assert_eq!(query["v1"], "data2_admin");
    }

    #[test]
    fn test_prefix_match_empty_value_is_literal() {
        let query = prefix_match("p", 0, &["", "data1"]).unwrap();
        assert_eq!(query.len(), 3);
        assert_eq!(query["v0"], "");
        assert_eq!(query["v1"], "data1");
    }

    #[test]
    fn test_prefix_match_without_values_constrains_ptype() {
        let query = prefix_match::<&str>("g", 1, &[]).unwrap();
        assert_eq!(query.len(), 1);
        assert_eq!(query["ptype"], "g");
    }

    #[test]
    fn test_prefix_match_overflow_matches_nothing() {
        assert!(prefix_match("g", 6, &["alice"]).is_none());
        assert!(prefix_match("g", 5, &["a", "b"]).is_none());
        let seven: Vec<String> = (0..7).map(|i| format!("v{}", i)).collect();
        assert!(prefix_match("g", 0, &seven).is_none());
        assert!(prefix_match("g", usize::MAX, &["a"]).is_none());
    }

    #[test]
    fn test_prefix_match_last_slot() {
        let query = prefix_match("p", 5, &["deny"]).unwrap();
        assert_eq!(query["v5"], "deny");
    }
}
