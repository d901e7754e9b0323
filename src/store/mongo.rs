//! MongoDB document store (`mongo` feature)
//!
//! Queries and documents cross the driver boundary as BSON; replies come back
//! as relaxed extended JSON, so a store-assigned ObjectId shows up as
//! `{"$oid": "..."}` under `_id` and is ignored by the rule codec.

use std::sync::Arc;

use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document as BsonDocument};
use mongodb::{sync, Client, Collection, IndexModel};
use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::{
    AsyncDocumentStore, AsyncStoreClient, BoxFuture, Document, DocumentStore, StoreClient,
    StoreCommand, StoreReply,
};

fn to_bson(document: &Document) -> StoreResult<BsonDocument> {
    bson::to_document(document).map_err(|e| StoreError::Backend(e.to_string()))
}

fn from_bson(document: BsonDocument) -> StoreResult<Document> {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Protocol(format!(
            "driver returned a non-document value: {}",
            other
        ))),
    }
}

fn set_update(set: &Document) -> StoreResult<BsonDocument> {
    Ok(doc! { "$set": to_bson(set)? })
}

fn ptype_index() -> IndexModel {
    IndexModel::builder().keys(doc! { "ptype": 1 }).build()
}

/// Non-blocking MongoDB collection handle
#[derive(Debug, Clone)]
pub struct MongoCollection {
    inner: Collection<BsonDocument>,
}

impl MongoCollection {
    /// Wrap a driver collection
    pub fn new(inner: Collection<BsonDocument>) -> Self {
        Self { inner }
    }

    async fn apply(&self, command: StoreCommand) -> StoreResult<StoreReply> {
        match command {
            StoreCommand::Find { query } => {
                let cursor = self.inner.find(to_bson(&query)?, None).await?;
                let found: Vec<BsonDocument> = cursor.try_collect().await?;
                let documents = found
                    .into_iter()
                    .map(from_bson)
                    .collect::<StoreResult<Vec<_>>>()?;
                Ok(StoreReply::Found(documents))
            }
            StoreCommand::Insert { documents } => {
                if documents.is_empty() {
                    return Ok(StoreReply::Inserted(0));
                }
                let documents = documents
                    .iter()
                    .map(to_bson)
                    .collect::<StoreResult<Vec<_>>>()?;
                let result = self.inner.insert_many(documents, None).await?;
                Ok(StoreReply::Inserted(result.inserted_ids.len() as u64))
            }
            StoreCommand::Delete { query } => {
                let result = self.inner.delete_many(to_bson(&query)?, None).await?;
                Ok(StoreReply::Deleted(result.deleted_count))
            }
            StoreCommand::UpdateOne { query, set } => {
                let update = set_update(&set)?;
                let result = self.inner.update_one(to_bson(&query)?, update, None).await?;
                Ok(StoreReply::Updated {
                    matched: result.matched_count,
                    modified: result.modified_count,
                })
            }
        }
    }
}

impl AsyncDocumentStore for MongoCollection {
    fn execute(&self, command: StoreCommand) -> BoxFuture<'_, StoreResult<StoreReply>> {
        Box::pin(self.apply(command))
    }
}

/// Non-blocking MongoDB client
#[derive(Debug, Clone)]
pub struct MongoClient {
    client: Client,
}

impl MongoClient {
    /// Wrap an already-connected driver client; the adapter does not own
    /// its connection.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect with a connection string
    pub async fn connect(uri: &str) -> StoreResult<Self> {
        Ok(Self::new(Client::with_uri_str(uri).await?))
    }
}

impl AsyncStoreClient for MongoClient {
    fn collection<'a>(
        &'a self,
        database: &'a str,
        collection: &'a str,
    ) -> BoxFuture<'a, StoreResult<Arc<dyn AsyncDocumentStore>>> {
        Box::pin(async move {
            let inner = self
                .client
                .database(database)
                .collection::<BsonDocument>(collection);
            inner.create_index(ptype_index(), None).await?;
            let handle: Arc<dyn AsyncDocumentStore> = Arc::new(MongoCollection::new(inner));
            Ok(handle)
        })
    }
}

/// Blocking MongoDB collection handle
#[derive(Debug, Clone)]
pub struct BlockingMongoCollection {
    inner: sync::Collection<BsonDocument>,
}

impl BlockingMongoCollection {
    /// Wrap a blocking driver collection
    pub fn new(inner: sync::Collection<BsonDocument>) -> Self {
        Self { inner }
    }
}

impl DocumentStore for BlockingMongoCollection {
    fn execute(&self, command: StoreCommand) -> StoreResult<StoreReply> {
        match command {
            StoreCommand::Find { query } => {
                let cursor = self.inner.find(to_bson(&query)?, None)?;
                let mut documents = Vec::new();
                for found in cursor {
                    documents.push(from_bson(found?)?);
                }
                Ok(StoreReply::Found(documents))
            }
            StoreCommand::Insert { documents } => {
                if documents.is_empty() {
                    return Ok(StoreReply::Inserted(0));
                }
                let documents = documents
                    .iter()
                    .map(to_bson)
                    .collect::<StoreResult<Vec<_>>>()?;
                let result = self.inner.insert_many(documents, None)?;
                Ok(StoreReply::Inserted(result.inserted_ids.len() as u64))
            }
            StoreCommand::Delete { query } => {
                let result = self.inner.delete_many(to_bson(&query)?, None)?;
                Ok(StoreReply::Deleted(result.deleted_count))
            }
            StoreCommand::UpdateOne { query, set } => {
                let update = set_update(&set)?;
                let result = self.inner.update_one(to_bson(&query)?, update, None)?;
                Ok(StoreReply::Updated {
                    matched: result.matched_count,
                    modified: result.modified_count,
                })
            }
        }
    }
}

/// Blocking MongoDB client
#[derive(Debug, Clone)]
pub struct BlockingMongoClient {
    client: sync::Client,
}

impl BlockingMongoClient {
    /// Wrap an already-connected blocking driver client
    pub fn new(client: sync::Client) -> Self {
        Self { client }
    }

    /// Connect with a connection string
    pub fn connect(uri: &str) -> StoreResult<Self> {
        Ok(Self::new(sync::Client::with_uri_str(uri)?))
    }
}

impl StoreClient for BlockingMongoClient {
    fn collection(
        &self,
        database: &str,
        collection: &str,
    ) -> StoreResult<Arc<dyn DocumentStore>> {
        let inner = self
            .client
            .database(database)
            .collection::<BsonDocument>(collection);
        inner.create_index(ptype_index(), None)?;
        let handle: Arc<dyn DocumentStore> = Arc::new(BlockingMongoCollection::new(inner));
        Ok(handle)
    }
}

#[cfg(all(test, feature = "mongo"))]
mod tests {
    use super::*;
    use crate::filter::{self, Filter};
    use crate::rule::RuleDocument;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn test_rule_document_survives_bson() {
        let rule = RuleDocument::from_rule("p", &["a", "b", "c", "d", "e", "f"]).unwrap();
        let document = rule.to_document();

        let converted = to_bson(&document).unwrap();
        assert_eq!(converted.len(), 7);
        assert_eq!(converted.get_str("v5").unwrap(), "f");

        assert_eq!(from_bson(converted).unwrap(), document);
    }

    #[test]
    fn test_object_id_comes_back_as_oid() {
        let id = ObjectId::new();
        let stored = doc! {
            "_id": id,
            "ptype": "g",
            "v0": "alice",
            "v1": "admin",
            "v2": "", "v3": "", "v4": "", "v5": "",
        };

        let document = from_bson(stored).unwrap();
        assert_eq!(document["_id"], serde_json::json!({ "$oid": id.to_hex() }));

        let rule = RuleDocument::from_document(&document)
            .unwrap()
            .unwrap()
            .into_rule();
        assert_eq!(rule.ptype, "g");
        assert_eq!(rule.fields, vec!["alice", "admin"]);
    }

    #[test]
    fn test_update_sets_six_positional_fields() {
        let set = RuleDocument::from_rule("p", &["alice", "data1", "write"])
            .unwrap()
            .positional_document();

        let update = set_update(&set).unwrap();
        let fields = update.get_document("$set").unwrap();
        assert_eq!(fields.len(), 6);
        assert!(!fields.contains_key("ptype"));
        assert_eq!(fields.get_str("v2").unwrap(), "write");
        assert_eq!(fields.get_str("v3").unwrap(), "");
    }

    #[test]
    fn test_exact_match_query_converts() {
        let query = filter::exact_match("p", &["alice", "data1"]).unwrap();
        let converted = to_bson(&query).unwrap();

        assert_eq!(converted.get_str("ptype").unwrap(), "p");
        assert_eq!(converted.get_str("v1").unwrap(), "data1");
        assert_eq!(converted.get_str("v2").unwrap(), "");
    }

    #[test]
    fn test_filtered_load_query_uses_in() {
        let filter = Filter::new()
            .with_ptype(["p"])
            .with_field(0, ["alice", "bob"])
            .unwrap();
        let converted = to_bson(&filter::build(&filter).unwrap()).unwrap();

        let users = converted
            .get_document("v0")
            .unwrap()
            .get_array("$in")
            .unwrap();
        assert_eq!(
            users,
            &vec![Bson::String("alice".into()), Bson::String("bob".into())]
        );
        assert!(converted.get_document("ptype").unwrap().contains_key("$in"));
    }
}
