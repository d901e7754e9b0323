//! In-process document store
//!
//! Collections live for the lifetime of the process. Clients opened through
//! `memory://<name>` share one registry per name, so two adapters pointed at
//! the same endpoint see the same rules, as they would with a server.

use std::collections::HashMap;
use std::future;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use super::collection::{self, Applied};
use super::errors::StoreResult;
use super::{
    AsyncDocumentStore, AsyncStoreClient, BoxFuture, Document, DocumentStore, StoreClient,
    StoreCommand, StoreReply,
};

/// Named registries backing `memory://<name>` endpoints.
///
/// Entries live for the whole process: a named endpoint behaves like a server
/// that outlives its connections. `MemoryClient::drop_database` empties a
/// database but keeps the name registered.
static REGISTRIES: OnceLock<Mutex<HashMap<String, MemoryClient>>> = OnceLock::new();

/// A single in-memory collection
#[derive(Debug, Default)]
pub struct MemoryCollection {
    documents: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.documents.read()?.len())
    }

    /// True when no documents are stored
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of every stored document, in insertion order
    pub fn snapshot(&self) -> StoreResult<Vec<Document>> {
        Ok(self.documents.read()?.clone())
    }

    fn apply(&self, command: StoreCommand) -> StoreResult<StoreReply> {
        // reads only need the shared lock
        if let StoreCommand::Find { query } = &command {
            let documents = self.documents.read()?;
            return Ok(StoreReply::Found(collection::find(&documents, query)?));
        }

        let mut documents = self.documents.write()?;
        let Applied { reply, .. } = collection::apply(&mut documents, command)?;
        Ok(reply)
    }
}

impl DocumentStore for MemoryCollection {
    fn execute(&self, command: StoreCommand) -> StoreResult<StoreReply> {
        self.apply(command)
    }
}

impl AsyncDocumentStore for MemoryCollection {
    fn execute(&self, command: StoreCommand) -> BoxFuture<'_, StoreResult<StoreReply>> {
        Box::pin(future::ready(self.apply(command)))
    }
}

/// Client over a set of in-memory collections
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    collections: Arc<RwLock<HashMap<(String, String), Arc<MemoryCollection>>>>,
}

impl MemoryClient {
    /// Create a client with its own, empty set of collections
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide client registered under `name`
    pub fn named(name: &str) -> Self {
        let registries = REGISTRIES.get_or_init(|| Mutex::new(HashMap::new()));
        let mut registries = match registries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        registries.entry(name.to_string()).or_default().clone()
    }

    /// Concrete handle for a collection, created on first use
    pub fn open(&self, database: &str, collection: &str) -> StoreResult<Arc<MemoryCollection>> {
        let key = (database.to_string(), collection.to_string());

        if let Some(existing) = self.collections.read()?.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let mut collections = self.collections.write()?;
        Ok(Arc::clone(collections.entry(key).or_default()))
    }

    /// Drop every collection of a database
    pub fn drop_database(&self, database: &str) -> StoreResult<()> {
        self.collections
            .write()?
            .retain(|(db, _), _| db.as_str() != database);
        Ok(())
    }
}

impl StoreClient for MemoryClient {
    fn collection(
        &self,
        database: &str,
        collection: &str,
    ) -> StoreResult<Arc<dyn DocumentStore>> {
        let handle: Arc<dyn DocumentStore> = self.open(database, collection)?;
        Ok(handle)
    }
}

impl AsyncStoreClient for MemoryClient {
    fn collection<'a>(
        &'a self,
        database: &'a str,
        collection: &'a str,
    ) -> BoxFuture<'a, StoreResult<Arc<dyn AsyncDocumentStore>>> {
        let handle = self
            .open(database, collection)
            .map(|c| -> Arc<dyn AsyncDocumentStore> { c });
        Box::pin(future::ready(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn obj(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_named_clients_share_collections() {
        let a = MemoryClient::named("memory-test-shared");
        let b = MemoryClient::named("memory-test-shared");

        let coll = a.open("casbin", "rules").unwrap();
        DocumentStore::execute(
            coll.as_ref(),
            StoreCommand::Insert {
                documents: vec![obj(json!({"ptype": "p"}))],
            },
        )
        .unwrap();

        assert_eq!(b.open("casbin", "rules").unwrap().len().unwrap(), 1);
    }

    #[test]
    fn test_fresh_clients_are_isolated() {
        let a = MemoryClient::new();
        let b = MemoryClient::new();
        a.open("casbin", "rules")
            .unwrap()
            .apply(StoreCommand::Insert {
                documents: vec![obj(json!({"ptype": "p"}))],
            })
            .unwrap();
        assert!(b.open("casbin", "rules").unwrap().is_empty().unwrap());
    }

    #[test]
    fn test_drop_database() {
        let client = MemoryClient::new();
        let coll = client.open("casbin", "rules").unwrap();
        coll.apply(StoreCommand::Insert {
            documents: vec![obj(json!({"ptype": "g"}))],
        })
        .unwrap();

        client.drop_database("casbin").unwrap();
        assert!(client.open("casbin", "rules").unwrap().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_async_execute() {
        let client = MemoryClient::new();
        let coll = AsyncStoreClient::collection(&client, "casbin", "rules")
            .await
            .unwrap();
        coll.execute(StoreCommand::Insert {
            documents: vec![obj(json!({"ptype": "p", "v0": "alice"}))],
        })
        .await
        .unwrap();

        let reply = coll
            .execute(StoreCommand::Find {
                query: obj(json!({"v0": "alice"})),
            })
            .await
            .unwrap();
        match reply {
            StoreReply::Found(docs) => assert_eq!(docs.len(), 1),
            other => panic!("unexpected reply {}", other),
        }
    }
}
