//! Blocking adapter surface

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use super::config::AdapterOptions;
use super::errors::AdapterResult;
use super::ops::{self, Script};
use super::PolicyAdapter;
use crate::filter::Filter;
use crate::model::PolicyModel;
use crate::observability::{AdapterEvent, OperationScope};
use crate::store::{self, DocumentStore, StoreClient};

/// Adapter whose operations run to completion on the calling thread
pub struct RuleAdapter {
    store: Arc<dyn DocumentStore>,
    filtered: AtomicBool,
}

impl RuleAdapter {
    /// Connect to the configured endpoint and bind to its collection
    pub fn new(options: &AdapterOptions) -> AdapterResult<Self> {
        options.validate()?;
        let endpoint = options.endpoint()?;
        let client = store::connect(&endpoint)?;
        info!(
            event = AdapterEvent::AdapterOpened.as_str(),
            scheme = endpoint.scheme(),
            endpoint = %endpoint,
            "connected to policy store"
        );
        Self::with_client(client.as_ref(), options)
    }

    /// Bind to a collection of an already-connected client
    pub fn with_client(client: &dyn StoreClient, options: &AdapterOptions) -> AdapterResult<Self> {
        options.validate()?;
        let database = options.database()?;
        let store = client.collection(database, &options.collection)?;
        info!(
            event = AdapterEvent::AdapterOpened.as_str(),
            database,
            collection = %options.collection,
            "bound to policy collection"
        );
        Ok(Self::from_store(store))
    }

    /// Wrap a collection handle directly
    pub fn from_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            filtered: AtomicBool::new(false),
        }
    }

    fn run<T>(&self, script: Script<T>) -> AdapterResult<T> {
        let (event, commands, finish) = script.into_parts();
        let scope = OperationScope::new(event);

        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            let name = command.name();
            match self.store.execute(command) {
                Ok(reply) => replies.push(reply),
                Err(e) => return Err(ops::abort(scope, name, e)),
            }
        }

        ops::conclude(scope, finish, replies)
    }
}

impl PolicyAdapter for RuleAdapter {
    fn load_policy(&self, model: &mut dyn PolicyModel) -> AdapterResult<()> {
        let rules = self.run(ops::load(None)?)?;
        ops::apply_loaded(model, rules);
        Ok(())
    }

    fn load_filtered_policy(
        &self,
        model: &mut dyn PolicyModel,
        filter: &Filter,
    ) -> AdapterResult<()> {
        let rules = self.run(ops::load(Some(filter))?)?;
        ops::apply_loaded(model, rules);
        self.filtered.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        self.filtered.load(Ordering::SeqCst)
    }

    fn save_policy(&self, model: &dyn PolicyModel) -> AdapterResult<()> {
        self.run(ops::save(model)?)
    }

    fn add_policy(&self, ptype: &str, rule: &[String]) -> AdapterResult<()> {
        self.run(ops::add(ptype, rule)?)
    }

    fn add_policies(&self, ptype: &str, rules: &[Vec<String>]) -> AdapterResult<()> {
        self.run(ops::add_many(ptype, rules)?)
    }

    fn remove_policy(&self, ptype: &str, rule: &[String]) -> AdapterResult<bool> {
        self.run(ops::remove(ptype, rule)?)
    }

    fn remove_policies(&self, ptype: &str, rules: &[Vec<String>]) -> AdapterResult<bool> {
        self.run(ops::remove_many(ptype, rules)?)
    }

    fn remove_filtered_policy(
        &self,
        ptype: &str,
        field_index: usize,
        values: &[String],
    ) -> AdapterResult<bool> {
        self.run(ops::remove_filtered(ptype, field_index, values))
    }

    fn update_policy(&self, ptype: &str, old: &[String], new: &[String]) -> AdapterResult<bool> {
        self.run(ops::update(ptype, old, new)?)
    }

    fn update_policies(
        &self,
        ptype: &str,
        old: &[Vec<String>],
        new: &[Vec<String>],
    ) -> AdapterResult<bool> {
        self.run(ops::update_many(ptype, old, new)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterError;
    use crate::model::MemoryModel;
    use crate::store::MemoryClient;

    fn strings(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    fn adapter() -> RuleAdapter {
        let client = MemoryClient::new();
        RuleAdapter::with_client(&client, &AdapterOptions::for_client("casbin")).unwrap()
    }

    #[test]
    fn test_new_rejects_missing_uri() {
        let err = RuleAdapter::new(&AdapterOptions::for_client("casbin"))
            .err()
            .unwrap();
        assert!(matches!(err, AdapterError::Configuration(_)));
    }

    #[test]
    fn test_add_then_load() {
        let adapter = adapter();
        adapter
            .add_policy("p", &strings(&["alice", "data1", "read"]))
            .unwrap();

        let mut model = MemoryModel::new();
        adapter.load_policy(&mut model).unwrap();
        assert!(model.has_rule("p", &["alice", "data1", "read"]));
        assert!(!adapter.is_filtered());
    }

    #[test]
    fn test_filtered_flag_is_sticky() {
        let adapter = adapter();
        let mut model = MemoryModel::new();

        adapter
            .load_filtered_policy(&mut model, &Filter::new().with_ptype(["p"]))
            .unwrap();
        assert!(adapter.is_filtered());

        adapter.load_policy(&mut model).unwrap();
        assert!(adapter.is_filtered());
    }

    #[test]
    fn test_remove_absent_rule_reports_false() {
        let adapter = adapter();
        assert!(!adapter
            .remove_policy("p", &strings(&["nobody", "data1", "read"]))
            .unwrap());
    }
}
