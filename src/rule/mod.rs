//! Rule codec
//!
//! A policy rule is a `ptype` tag plus up to six positional fields. Storage is
//! fixed-width: every document carries `ptype` and `v0`..`v5`, unused slots
//! hold the empty string so any position can be addressed by a query.
//! Decoding drops trailing empty slots, so the rule handed back to the model
//! has the arity it was inserted with.

mod codec;

pub use codec::{PolicyRule, RuleDocument, FIELD_NAMES, MAX_FIELDS, PTYPE_FIELD};
