//! policy-store-adapter - Document-store persistence for authorization policy rules
//!
//! Synchronizes an engine-owned policy model with rules kept as flat documents
//! (`ptype`, `v0`..`v5`) in a single collection. Two surfaces share one set of
//! operation scripts:
//!
//! - [`RuleAdapter`]: blocking, every call runs to completion on the caller
//! - [`AsyncRuleAdapter`]: non-blocking, every store interaction is an await point
//!
//! Collections are reached through `memory://`, `file://` or (with the `mongo`
//! feature) `mongodb://` endpoints.

pub mod adapter;
pub mod cli;
pub mod filter;
pub mod model;
pub mod observability;
pub mod rule;
pub mod store;

pub use adapter::{
    AdapterError, AdapterOptions, AdapterResult, AsyncPolicyAdapter, AsyncRuleAdapter,
    PolicyAdapter, RuleAdapter,
};
pub use filter::{Filter, FilterQuery};
pub use model::{MemoryModel, PolicyModel, RuleSection};
pub use rule::{PolicyRule, RuleDocument};
