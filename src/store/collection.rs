//! Command application over an in-memory document list
//!
//! Shared by the memory and file backends. Queries are compiled before any
//! document is touched, so an unsupported query never mutates the list.

use serde_json::Value;

use super::errors::StoreResult;
use super::matcher::Matcher;
use super::{Document, Query, StoreCommand, StoreReply};

/// Key under which local backends store their document identifier
pub(crate) const ID_FIELD: &str = "_id";

/// Result of applying a command: the reply and whether the list changed
pub(crate) struct Applied {
    pub reply: StoreReply,
    pub mutated: bool,
}

/// Apply a command to a document list
pub(crate) fn apply(documents: &mut Vec<Document>, command: StoreCommand) -> StoreResult<Applied> {
    match command {
        StoreCommand::Find { query } => Ok(Applied {
            reply: StoreReply::Found(find(documents, &query)?),
            mutated: false,
        }),
        StoreCommand::Insert {
            documents: incoming,
        } => {
            let count = incoming.len() as u64;
            for mut document in incoming {
                ensure_id(&mut document);
                documents.push(document);
            }
            Ok(Applied {
                reply: StoreReply::Inserted(count),
                mutated: count > 0,
            })
        }
        StoreCommand::Delete { query } => {
            let matcher = Matcher::compile(&query)?;
            let before = documents.len();
            if matcher.is_empty() {
                documents.clear();
            } else {
                documents.retain(|d| !matcher.matches(d));
            }
            let deleted = (before - documents.len()) as u64;
            Ok(Applied {
                reply: StoreReply::Deleted(deleted),
                mutated: deleted > 0,
            })
        }
        StoreCommand::UpdateOne { query, set } => {
            let matcher = Matcher::compile(&query)?;
            let target = match documents.iter_mut().find(|d| matcher.matches(d)) {
                Some(target) => target,
                None => {
                    return Ok(Applied {
                        reply: StoreReply::Updated {
                            matched: 0,
                            modified: 0,
                        },
                        mutated: false,
                    })
                }
            };

            let mut changed = false;
            for (key, value) in set {
                if target.get(&key) != Some(&value) {
                    target.insert(key, value);
                    changed = true;
                }
            }

            Ok(Applied {
                reply: StoreReply::Updated {
                    matched: 1,
                    modified: changed as u64,
                },
                mutated: changed,
            })
        }
    }
}

/// Documents matching a query, in list order
pub(crate) fn find(documents: &[Document], query: &Query) -> StoreResult<Vec<Document>> {
    let matcher = Matcher::compile(query)?;
    Ok(documents
        .iter()
        .filter(|d| matcher.matches(d))
        .cloned()
        .collect())
}

fn ensure_id(document: &mut Document) {
    if !document.contains_key(ID_FIELD) {
        document.insert(
            ID_FIELD.to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
    }
}
