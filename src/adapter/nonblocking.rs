//! Non-blocking adapter surface
//!
//! Every store command is an await point. Futures are boxed and `Send`, so
//! one adapter can be shared across tokio tasks behind an `Arc`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use super::config::AdapterOptions;
use super::errors::AdapterResult;
use super::ops::{self, Script};
use super::AsyncPolicyAdapter;
use crate::filter::Filter;
use crate::model::PolicyModel;
use crate::observability::{AdapterEvent, OperationScope};
use crate::store::{self, AsyncDocumentStore, AsyncStoreClient, BoxFuture};

/// Adapter whose operations suspend on store I/O
pub struct AsyncRuleAdapter {
    store: Arc<dyn AsyncDocumentStore>,
    filtered: AtomicBool,
}

impl AsyncRuleAdapter {
    /// Connect to the configured endpoint and bind to its collection
    pub async fn new(options: &AdapterOptions) -> AdapterResult<Self> {
        options.validate()?;
        let endpoint = options.endpoint()?;
        let client = store::connect_async(&endpoint).await?;
        info!(
            event = AdapterEvent::AdapterOpened.as_str(),
            scheme = endpoint.scheme(),
            endpoint = %endpoint,
            "connected to policy store"
        );
        Self::with_client(client.as_ref(), options).await
    }

    /// Bind to a collection of an already-connected client
    pub async fn with_client(
        client: &dyn AsyncStoreClient,
        options: &AdapterOptions,
    ) -> AdapterResult<Self> {
        options.validate()?;
        let database = options.database()?;
        let store = client.collection(database, &options.collection).await?;
        info!(
            event = AdapterEvent::AdapterOpened.as_str(),
            database,
            collection = %options.collection,
            "bound to policy collection"
        );
        Ok(Self::from_store(store))
    }

    /// Wrap a collection handle directly
    pub fn from_store(store: Arc<dyn AsyncDocumentStore>) -> Self {
        Self {
            store,
            filtered: AtomicBool::new(false),
        }
    }

    async fn run<T>(&self, script: Script<T>) -> AdapterResult<T> {
        let (event, commands, finish) = script.into_parts();
        let scope = OperationScope::new(event);

        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            let name = command.name();
            match self.store.execute(command).await {
                Ok(reply) => replies.push(reply),
                Err(e) => return Err(ops::abort(scope, name, e)),
            }
        }

        ops::conclude(scope, finish, replies)
    }
}

impl AsyncPolicyAdapter for AsyncRuleAdapter {
    fn load_policy<'a>(
        &'a self,
        model: &'a mut dyn PolicyModel,
    ) -> BoxFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            let rules = self.run(ops::load(None)?).await?;
            ops::apply_loaded(model, rules);
            Ok(())
        })
    }

    fn load_filtered_policy<'a>(
        &'a self,
        model: &'a mut dyn PolicyModel,
        filter: &'a Filter,
    ) -> BoxFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            let rules = self.run(ops::load(Some(filter))?).await?;
            ops::apply_loaded(model, rules);
            self.filtered.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn is_filtered(&self) -> bool {
        self.filtered.load(Ordering::SeqCst)
    }

    fn save_policy<'a>(&'a self, model: &'a dyn PolicyModel) -> BoxFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            let script = ops::save(model)?;
            self.run(script).await
        })
    }

    fn add_policy<'a>(
        &'a self,
        ptype: &'a str,
        rule: &'a [String],
    ) -> BoxFuture<'a, AdapterResult<()>> {
        Box::pin(async move { self.run(ops::add(ptype, rule)?).await })
    }

    fn add_policies<'a>(
        &'a self,
        ptype: &'a str,
        rules: &'a [Vec<String>],
    ) -> BoxFuture<'a, AdapterResult<()>> {
        Box::pin(async move { self.run(ops::add_many(ptype, rules)?).await })
    }

    fn remove_policy<'a>(
        &'a self,
        ptype: &'a str,
        rule: &'a [String],
    ) -> BoxFuture<'a, AdapterResult<bool>> {
        Box::pin(async move { self.run(ops::remove(ptype, rule)?).await })
    }

    fn remove_policies<'a>(
        &'a self,
        ptype: &'a str,
        rules: &'a [Vec<String>],
    ) -> BoxFuture<'a, AdapterResult<bool>> {
        Box::pin(async move { self.run(ops::remove_many(ptype, rules)?).await })
    }

    fn remove_filtered_policy<'a>(
        &'a self,
        ptype: &'a str,
        field_index: usize,
        values: &'a [String],
    ) -> BoxFuture<'a, AdapterResult<bool>> {
        Box::pin(async move {
            self.run(ops::remove_filtered(ptype, field_index, values))
                .await
        })
    }

    fn update_policy<'a>(
        &'a self,
        ptype: &'a str,
        old: &'a [String],
        new: &'a [String],
    ) -> BoxFuture<'a, AdapterResult<bool>> {
        Box::pin(async move { self.run(ops::update(ptype, old, new)?).await })
    }

    fn update_policies<'a>(
        &'a self,
        ptype: &'a str,
        old: &'a [Vec<String>],
        new: &'a [Vec<String>],
    ) -> BoxFuture<'a, AdapterResult<bool>> {
        Box::pin(async move { self.run(ops::update_many(ptype, old, new)?).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryModel;
    use crate::store::MemoryClient;

    #[tokio::test]
    async fn test_add_then_load() {
        let client = MemoryClient::new();
        let adapter = AsyncRuleAdapter::with_client(&client, &AdapterOptions::for_client("casbin"))
            .await
            .unwrap();

        let rule = vec!["alice".to_string(), "data1".to_string(), "read".to_string()];
        adapter.add_policy("p", &rule).await.unwrap();

        let mut model = MemoryModel::new();
        adapter.load_policy(&mut model).await.unwrap();
        assert!(model.has_rule("p", &["alice", "data1", "read"]));
    }

    #[tokio::test]
    async fn test_new_from_memory_uri() {
        let options = AdapterOptions::new("memory://nonblocking-unit", "casbin");
        let adapter = AsyncRuleAdapter::new(&options).await.unwrap();
        assert!(!adapter.is_filtered());
    }

    #[test]
    fn test_futures_are_send() {
        fn assert_send<T: Send>(_: &T) {}
        let adapter = AsyncRuleAdapter::from_store(Arc::new(crate::store::MemoryCollection::new()));
        let rule: Vec<String> = Vec::new();
        let future = adapter.remove_policy("p", &rule);
        assert_send(&future);
    }
}
