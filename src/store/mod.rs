//! Document stores
//!
//! The adapter talks to a single collection through a small command
//! protocol: find, insert, delete and update-one, each carrying Mongo-style
//! query documents. A collection handle implements [`DocumentStore`]
//! (blocking) and/or [`AsyncDocumentStore`] (suspending); a client
//! implements [`StoreClient`] / [`AsyncStoreClient`] and hands out handles
//! scoped to one database/collection pair.
//!
//! Backends:
//! - `memory://<name>`: in-process collections, shared by name
//! - `file://<dir>`: checksummed collection files under `<dir>/<database>/`
//! - `mongodb://...`: MongoDB, with the `mongo` feature

mod collection;
mod endpoint;
mod errors;
mod file;
mod matcher;
mod memory;
#[cfg(feature = "mongo")]
mod mongo;
mod record;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::adapter::AdapterResult;

pub use endpoint::Endpoint;
pub use errors::{StoreError, StoreResult};
pub use file::{FileClient, FileCollection};
pub use matcher::Matcher;
pub use memory::{MemoryClient, MemoryCollection};
#[cfg(feature = "mongo")]
pub use mongo::{BlockingMongoClient, BlockingMongoCollection, MongoClient, MongoCollection};

/// A stored document: a flat JSON object
pub type Document = Map<String, Value>;

/// A Mongo-style query document; the empty query matches everything
pub type Query = Map<String, Value>;

/// Boxed future returned by the non-blocking traits
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single request against a collection
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    /// Fetch every document matching the query, in store order
    Find { query: Query },
    /// Insert documents in order, stopping at the first failure
    Insert { documents: Vec<Document> },
    /// Delete every document matching the query
    Delete { query: Query },
    /// Set `set`'s fields on the first document matching the query
    UpdateOne { query: Query, set: Document },
}

impl StoreCommand {
    /// Command name for logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            StoreCommand::Find { .. } => "find",
            StoreCommand::Insert { .. } => "insert",
            StoreCommand::Delete { .. } => "delete",
            StoreCommand::UpdateOne { .. } => "update_one",
        }
    }
}

/// Reply to a [`StoreCommand`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreReply {
    /// Documents returned by a find
    Found(Vec<Document>),
    /// Number of documents inserted
    Inserted(u64),
    /// Number of documents deleted
    Deleted(u64),
    /// Documents matched and actually changed by an update
    Updated { matched: u64, modified: u64 },
}

impl fmt::Display for StoreReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreReply::Found(docs) => write!(f, "found({})", docs.len()),
            StoreReply::Inserted(n) => write!(f, "inserted({})", n),
            StoreReply::Deleted(n) => write!(f, "deleted({})", n),
            StoreReply::Updated { matched, modified } => {
                write!(f, "updated(matched={}, modified={})", matched, modified)
            }
        }
    }
}

/// Blocking collection handle
pub trait DocumentStore: Send + Sync {
    /// Run one command to completion on the calling thread
    fn execute(&self, command: StoreCommand) -> StoreResult<StoreReply>;
}

/// Non-blocking collection handle
pub trait AsyncDocumentStore: Send + Sync {
    /// Run one command, suspending the caller until the store answers
    fn execute(&self, command: StoreCommand) -> BoxFuture<'_, StoreResult<StoreReply>>;
}

/// Blocking client handing out collection handles
pub trait StoreClient: Send + Sync {
    /// Handle for `collection` inside `database`
    fn collection(&self, database: &str, collection: &str)
        -> StoreResult<Arc<dyn DocumentStore>>;
}

/// Non-blocking client handing out collection handles
pub trait AsyncStoreClient: Send + Sync {
    /// Handle for `collection` inside `database`
    fn collection<'a>(
        &'a self,
        database: &'a str,
        collection: &'a str,
    ) -> BoxFuture<'a, StoreResult<Arc<dyn AsyncDocumentStore>>>;
}

/// Open a blocking client for an endpoint
pub fn connect(endpoint: &Endpoint) -> AdapterResult<Arc<dyn StoreClient>> {
    match endpoint {
        Endpoint::Memory(name) => Ok(Arc::new(MemoryClient::named(name))),
        Endpoint::File(root) => Ok(Arc::new(FileClient::new(root.clone()))),
        #[cfg(feature = "mongo")]
        Endpoint::Mongo(uri) => Ok(Arc::new(BlockingMongoClient::connect(uri)?)),
        #[cfg(not(feature = "mongo"))]
        Endpoint::Mongo(_) => Err(mongo_disabled()),
    }
}

/// Open a non-blocking client for an endpoint
pub async fn connect_async(endpoint: &Endpoint) -> AdapterResult<Arc<dyn AsyncStoreClient>> {
    match endpoint {
        Endpoint::Memory(name) => Ok(Arc::new(MemoryClient::named(name))),
        Endpoint::File(root) => Ok(Arc::new(FileClient::new(root.clone()))),
        #[cfg(feature = "mongo")]
        Endpoint::Mongo(uri) => Ok(Arc::new(MongoClient::connect(uri).await?)),
        #[cfg(not(feature = "mongo"))]
        Endpoint::Mongo(_) => Err(mongo_disabled()),
    }
}

#[cfg(not(feature = "mongo"))]
fn mongo_disabled() -> crate::adapter::AdapterError {
    crate::adapter::AdapterError::Configuration(
        "mongodb endpoints require the `mongo` feature".to_string(),
    )
}
