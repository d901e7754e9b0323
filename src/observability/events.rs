//! Adapter events
//!
//! Every log line the adapter emits carries one of these names in its
//! `event` field.

use std::fmt;

use tracing::Level;

/// Observable adapter events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterEvent {
    // Lifecycle
    /// Adapter bound to a collection
    AdapterOpened,

    // Loads
    /// Full load into the model
    LoadPolicy,
    /// Filtered load into the model
    LoadFilteredPolicy,
    /// Stored document without a policy type was skipped
    DocumentSkipped,

    // Save
    /// Collection replaced with the model's rules
    SavePolicy,

    // Incremental mutations
    AddPolicy,
    AddPolicies,
    RemovePolicy,
    RemovePolicies,
    RemoveFilteredPolicy,
    UpdatePolicy,
    UpdatePolicies,

    // Failures
    /// A store command failed; the error is surfaced to the caller
    StoreFailure,
}

impl AdapterEvent {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterEvent::AdapterOpened => "ADAPTER_OPENED",

            AdapterEvent::LoadPolicy => "LOAD_POLICY",
            AdapterEvent::LoadFilteredPolicy => "LOAD_FILTERED_POLICY",
            AdapterEvent::DocumentSkipped => "DOCUMENT_SKIPPED",

            AdapterEvent::SavePolicy => "SAVE_POLICY",

            AdapterEvent::AddPolicy => "ADD_POLICY",
            AdapterEvent::AddPolicies => "ADD_POLICIES",
            AdapterEvent::RemovePolicy => "REMOVE_POLICY",
            AdapterEvent::RemovePolicies => "REMOVE_POLICIES",
            AdapterEvent::RemoveFilteredPolicy => "REMOVE_FILTERED_POLICY",
            AdapterEvent::UpdatePolicy => "UPDATE_POLICY",
            AdapterEvent::UpdatePolicies => "UPDATE_POLICIES",

            AdapterEvent::StoreFailure => "STORE_FAILURE",
        }
    }

    /// Level at which a successful occurrence is logged
    pub fn level(&self) -> Level {
        match self {
            AdapterEvent::AdapterOpened
            | AdapterEvent::LoadPolicy
            | AdapterEvent::LoadFilteredPolicy
            | AdapterEvent::SavePolicy => Level::INFO,
            AdapterEvent::DocumentSkipped => Level::WARN,
            AdapterEvent::StoreFailure => Level::ERROR,
            _ => Level::DEBUG,
        }
    }
}

impl fmt::Display for AdapterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
