//! # Adapter Core
//!
//! The persistence contract an authorization engine drives: load the whole
//! rule set (or a filtered slice) into its model, replace the stored set
//! with the model's, and apply incremental adds, removes and updates.
//!
//! Two surfaces implement the same contract over the same operation scripts:
//!
//! | Surface              | Trait                  | Store trait             |
//! |----------------------|------------------------|-------------------------|
//! | [`RuleAdapter`]      | [`PolicyAdapter`]      | `DocumentStore`         |
//! | [`AsyncRuleAdapter`] | [`AsyncPolicyAdapter`] | `AsyncDocumentStore`    |
//!
//! The adapter keeps no rule state. Its only state is the filtered-load flag,
//! which stays set once any filtered load has succeeded.
//!
//! Removal and update results are booleans: `false` means nothing matched,
//! which is not an error.

mod blocking;
mod config;
mod errors;
mod nonblocking;
mod ops;

pub use blocking::RuleAdapter;
pub use config::{AdapterOptions, DEFAULT_COLLECTION};
pub use errors::{AdapterError, AdapterResult};
pub use nonblocking::AsyncRuleAdapter;

use crate::filter::Filter;
use crate::model::PolicyModel;
use crate::store::BoxFuture;

/// Blocking persistence contract
pub trait PolicyAdapter: Send + Sync {
    /// Insert every stored rule into `model`. Nothing is inserted unless
    /// every document decodes.
    fn load_policy(&self, model: &mut dyn PolicyModel) -> AdapterResult<()>;

    /// Insert the stored rules accepted by `filter` and mark the adapter as
    /// filtered
    fn load_filtered_policy(&self, model: &mut dyn PolicyModel, filter: &Filter)
        -> AdapterResult<()>;

    /// True once any filtered load has succeeded
    fn is_filtered(&self) -> bool;

    /// Replace the stored rules with the model's. Not atomic: a failure
    /// after the delete leaves the collection partially written.
    fn save_policy(&self, model: &dyn PolicyModel) -> AdapterResult<()>;

    /// Store one rule; duplicates are not checked
    fn add_policy(&self, ptype: &str, rule: &[String]) -> AdapterResult<()>;

    /// Store a batch of rules in order
    fn add_policies(&self, ptype: &str, rules: &[Vec<String>]) -> AdapterResult<()>;

    /// Delete documents stored exactly as `rule`
    fn remove_policy(&self, ptype: &str, rule: &[String]) -> AdapterResult<bool>;

    /// Delete each rule; true only if every rule removed something
    fn remove_policies(&self, ptype: &str, rules: &[Vec<String>]) -> AdapterResult<bool>;

    /// Delete rules whose fields starting at `field_index` equal `values`;
    /// no values deletes every rule of `ptype`
    fn remove_filtered_policy(
        &self,
        ptype: &str,
        field_index: usize,
        values: &[String],
    ) -> AdapterResult<bool>;

    /// Replace the first rule stored as `old` with `new`
    fn update_policy(&self, ptype: &str, old: &[String], new: &[String]) -> AdapterResult<bool>;

    /// Pairwise updates; true only if every pair matched
    fn update_policies(
        &self,
        ptype: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> AdapterResult<bool>;
}

/// Non-blocking persistence contract; same semantics as [`PolicyAdapter`]
pub trait AsyncPolicyAdapter: Send + Sync {
    fn load_policy<'a>(&'a self, model: &'a mut dyn PolicyModel)
        -> BoxFuture<'a, AdapterResult<()>>;

    fn load_filtered_policy<'a>(
        &'a self,
        model: &'a mut dyn PolicyModel,
        filter: &'a Filter,
    ) -> BoxFuture<'a, AdapterResult<()>>;

    fn is_filtered(&self) -> bool;

    fn save_policy<'a>(&'a self, model: &'a dyn PolicyModel) -> BoxFuture<'a, AdapterResult<()>>;

    fn add_policy<'a>(&'a self, ptype: &'a str, rule: &'a [String])
        -> BoxFuture<'a, AdapterResult<()>>;

    fn add_policies<'a>(
        &'a self,
        ptype: &'a str,
        rules: &'a [Vec<String>],
    ) -> BoxFuture<'a, AdapterResult<()>>;

    fn remove_policy<'a>(
        &'a self,
        ptype: &'a str,
        rule: &'a [String],
    ) -> BoxFuture<'a, AdapterResult<bool>>;

    fn remove_policies<'a>(
        &'a self,
        ptype: &'a str,
        rules: &'a [Vec<String>],
    ) -> BoxFuture<'a, AdapterResult<bool>>;

    fn remove_filtered_policy<'a>(
        &'a self,
        ptype: &'a str,
        field_index: usize,
        values: &'a [String],
    ) -> BoxFuture<'a, AdapterResult<bool>>;

    fn update_policy<'a>(
        &'a self,
        ptype: &'a str,
        old: &'a [String],
        new: &'a [String],
    ) -> BoxFuture<'a, AdapterResult<bool>>;

    fn update_policies<'a>(
        &'a self,
        ptype: &'a str,
        old: &'a [Vec<String>],
        new: &'a [Vec<String>],
    ) -> BoxFuture<'a, AdapterResult<bool>>;
}
