//! Query matching for the local backends
//!
//! Implements the subset of Mongo query documents the adapter and typical raw
//! filters use:
//!
//! - `{field: value}` and `{field: {"$eq": value}}`
//! - `$ne`, `$in`, `$nin`, `$exists`
//! - top-level `$and`, `$or`, `$nor`
//!
//! A `null` operand matches both a null and a missing field. Anything else is
//! rejected at compile time with `StoreError::UnsupportedQuery`, so a query
//! never half-applies to a collection.

use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::{Document, Query};

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
}

impl Condition {
    fn holds(&self, actual: Option<&Value>) -> bool {
        match self {
            Condition::Eq(expected) => equals(actual, expected),
            Condition::Ne(expected) => !equals(actual, expected),
            Condition::In(options) => options.iter().any(|o| equals(actual, o)),
            Condition::Nin(options) => !options.iter().any(|o| equals(actual, o)),
            Condition::Exists(expected) => actual.is_some() == *expected,
        }
    }
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None | Some(Value::Null) => expected.is_null(),
        Some(value) => value == expected,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Field {
        field: String,
        conditions: Vec<Condition>,
    },
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
    Nor(Vec<Matcher>),
}

impl Predicate {
    fn holds(&self, document: &Document) -> bool {
        match self {
            Predicate::Field { field, conditions } => {
                let actual = document.get(field);
                conditions.iter().all(|c| c.holds(actual))
            }
            Predicate::And(clauses) => clauses.iter().all(|m| m.matches(document)),
            Predicate::Or(clauses) => clauses.iter().any(|m| m.matches(document)),
            Predicate::Nor(clauses) => !clauses.iter().any(|m| m.matches(document)),
        }
    }
}

/// A compiled query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matcher {
    predicates: Vec<Predicate>,
}

impl Matcher {
    /// Compile a query document
    pub fn compile(query: &Query) -> StoreResult<Self> {
        let mut predicates = Vec::with_capacity(query.len());

        for (key, value) in query {
            let predicate = match key.as_str() {
                "$and" => Predicate::And(Self::compile_clauses(key, value)?),
                "$or" => Predicate::Or(Self::compile_clauses(key, value)?),
                "$nor" => Predicate::Nor(Self::compile_clauses(key, value)?),
                op if op.starts_with('$') => {
                    return Err(StoreError::unsupported(format!(
                        "top-level operator {}",
                        op
                    )))
                }
                field => Predicate::Field {
                    field: field.to_string(),
                    conditions: Self::compile_conditions(field, value)?,
                },
            };
            predicates.push(predicate);
        }

        Ok(Self { predicates })
    }

    /// True when the query has no constraints
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Checks a document against every predicate (AND semantics)
    pub fn matches(&self, document: &Document) -> bool {
        self.predicates.iter().all(|p| p.holds(document))
    }

    fn compile_clauses(op: &str, value: &Value) -> StoreResult<Vec<Matcher>> {
        let clauses = value
            .as_array()
            .filter(|clauses| !clauses.is_empty())
            .ok_or_else(|| StoreError::unsupported(format!("{} expects a non-empty array", op)))?;

        clauses
            .iter()
            .map(|clause| match clause {
                Value::Object(query) => Self::compile(query),
                other => Err(StoreError::unsupported(format!(
                    "{} clause must be an object, found {}",
                    op, other
                ))),
            })
            .collect()
    }

    fn compile_conditions(field: &str, value: &Value) -> StoreResult<Vec<Condition>> {
        let operators = match value {
            Value::Object(map) if map.keys().any(|k| k.starts_with('$')) => map,
            literal => return Ok(vec![Condition::Eq(literal.clone())]),
        };

        let mut conditions = Vec::with_capacity(operators.len());
        for (op, operand) in operators {
            let condition = match op.as_str() {
                "$eq" => Condition::Eq(operand.clone()),
                "$ne" => Condition::Ne(operand.clone()),
                "$in" => Condition::In(Self::operand_list(field, op, operand)?),
                "$nin" => Condition::Nin(Self::operand_list(field, op, operand)?),
                "$exists" => match operand {
                    Value::Bool(expected) => Condition::Exists(*expected),
                    other => {
                        return Err(StoreError::unsupported(format!(
                            "$exists on {} expects a boolean, found {}",
                            field, other
                        )))
                    }
                },
                other if other.starts_with('$') => {
                    return Err(StoreError::unsupported(format!(
                        "operator {} on field {}",
                        other, field
                    )))
                }
                other => {
                    return Err(StoreError::unsupported(format!(
                        "field {} mixes operators with plain key {}",
                        field, other
                    )))
                }
            };
            conditions.push(condition);
        }

        Ok(conditions)
    }

    fn operand_list(field: &str, op: &str, operand: &Value) -> StoreResult<Vec<Value>> {
        operand.as_array().cloned().ok_or_else(|| {
            StoreError::unsupported(format!("{} on {} expects an array", op, field))
        })
    }
}
