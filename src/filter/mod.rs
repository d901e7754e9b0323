//! # Filter Builder
//!
//! Produces the store queries the adapter sends:
//!
//! - [`build`]: filtered loads, from a structured [`Filter`] or its raw query
//! - [`exact_match`]: single-rule removal and updates
//! - [`prefix_match`]: positional removal starting at a field index
//!
//! A raw query is resolved into [`FilterQuery::Raw`] here and passed through
//! untouched; nothing downstream inspects it.

mod builder;

pub use builder::{build, exact_match, match_all, prefix_match, Filter, FilterQuery};
