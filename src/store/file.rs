//! File-backed document store
//!
//! Layout under the endpoint root:
//!
//! ```text
//! <root>/<database>/<collection>.dat
//! ```
//!
//! Every command reads the collection file, verifies all checksums and
//! applies the command. A mutating command rewrites the whole file through a
//! temporary sibling, fsyncs it and renames it into place, so readers see
//! either the old or the new collection. Commands on one file are serialized
//! inside the process.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use super::collection::{self, Applied};
use super::errors::{StoreError, StoreResult};
use super::record;
use super::{
    AsyncDocumentStore, AsyncStoreClient, BoxFuture, Document, DocumentStore, StoreClient,
    StoreCommand, StoreReply,
};

const COLLECTION_EXTENSION: &str = "dat";

/// Per-path locks shared by every open handle in the process
static FILE_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

fn file_locks() -> MutexGuard<'static, HashMap<PathBuf, Arc<Mutex<()>>>> {
    let locks = FILE_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    match locks.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Shared lock for `path`. Entries no handle holds any more are pruned here.
fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let mut locks = file_locks();
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    Arc::clone(locks.entry(path.to_path_buf()).or_default())
}

fn validate_name(kind: &str, name: &str) -> StoreResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        return Err(StoreError::Io(format!("invalid {} name: {:?}", kind, name)));
    }
    Ok(())
}

#[derive(Debug)]
struct FileCollectionInner {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileCollectionInner {
    fn apply(&self, command: StoreCommand) -> StoreResult<StoreReply> {
        let _guard = self.lock.lock()?;

        let mut documents = self.read_all()?;
        let Applied { reply, mutated } = collection::apply(&mut documents, command)?;
        if mutated {
            self.write_all(&documents)?;
        }

        Ok(reply)
    }

    fn read_all(&self) -> StoreResult<Vec<Document>> {
        match fs::read(&self.path) {
            Ok(bytes) => record::decode_all(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::Io(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn write_all(&self, documents: &[Document]) -> StoreResult<()> {
        let mut buffer = Vec::new();
        for document in documents {
            buffer.extend(record::encode(document)?);
        }

        let tmp_path = self.path.with_extension("dat.tmp");
        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&buffer)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        };

        write().map_err(|e| {
            StoreError::Io(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

/// Handle to one collection file
#[derive(Debug, Clone)]
pub struct FileCollection {
    inner: Arc<FileCollectionInner>,
}

impl FileCollection {
    /// Handle for the collection file at `path`; the file is created on the
    /// first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = lock_for(&path);
        Self {
            inner: Arc::new(FileCollectionInner { path, lock }),
        }
    }

    /// Path of the collection file
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

impl DocumentStore for FileCollection {
    fn execute(&self, command: StoreCommand) -> StoreResult<StoreReply> {
        self.inner.apply(command)
    }
}

impl AsyncDocumentStore for FileCollection {
    fn execute(&self, command: StoreCommand) -> BoxFuture<'_, StoreResult<StoreReply>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || inner.apply(command))
                .await
                .map_err(|e| StoreError::Interrupted(e.to_string()))?
        })
    }
}

/// Client rooted at a directory
#[derive(Debug, Clone)]
pub struct FileClient {
    root: PathBuf,
}

impl FileClient {
    /// Create a client rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Concrete handle for a collection, creating the database directory
    pub fn open(&self, database: &str, collection: &str) -> StoreResult<FileCollection> {
        validate_name("database", database)?;
        validate_name("collection", collection)?;

        let dir = self.root.join(database);
        fs::create_dir_all(&dir).map_err(|e| {
            StoreError::Io(format!("failed to create {}: {}", dir.display(), e))
        })?;

        let path = dir.join(format!("{}.{}", collection, COLLECTION_EXTENSION));
        Ok(FileCollection::open(path))
    }
}

impl StoreClient for FileClient {
    fn collection(
        &self,
        database: &str,
        collection: &str,
    ) -> StoreResult<Arc<dyn DocumentStore>> {
        let handle: Arc<dyn DocumentStore> = Arc::new(self.open(database, collection)?);
        Ok(handle)
    }
}

impl AsyncStoreClient for FileClient {
    fn collection<'a>(
        &'a self,
        database: &'a str,
        collection: &'a str,
    ) -> BoxFuture<'a, StoreResult<Arc<dyn AsyncDocumentStore>>> {
        Box::pin(async move {
            let client = self.clone();
            let database = database.to_string();
            let collection = collection.to_string();
            let handle = tokio::task::spawn_blocking(move || client.open(&database, &collection))
                .await
                .map_err(|e| StoreError::Interrupted(e.to_string()))??;
            let handle: Arc<dyn AsyncDocumentStore> = Arc::new(handle);
            Ok(handle)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn obj(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_released_locks_are_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.dat");
        let second = temp_dir.path().join("second.dat");

        let handle = FileCollection::open(&first);
        let clone = handle.clone();
        assert!(file_locks().contains_key(&first));

        drop(handle);
        drop(clone);
        let _other = FileCollection::open(&second);

        let locks = file_locks();
        assert!(!locks.contains_key(&first));
        assert!(locks.contains_key(&second));
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let coll = FileClient::new(temp_dir.path())
            .open("casbin", "rules")
            .unwrap();

        let reply = DocumentStore::execute(
            &coll,
            StoreCommand::Find {
                query: Default::default(),
            },
        )
        .unwrap();
        assert_eq!(reply, StoreReply::Found(Vec::new()));
        assert!(!coll.path().exists());
    }

    #[test]
    fn test_reads_do_not_create_file_but_writes_do() {
        let temp_dir = TempDir::new().unwrap();
        let coll = FileClient::new(temp_dir.path())
            .open("casbin", "rules")
            .unwrap();

        DocumentStore::execute(
            &coll,
            StoreCommand::Insert {
                documents: vec![obj(json!({"ptype": "p", "v0": "alice"}))],
            },
        )
        .unwrap();

        assert!(coll.path().exists());
        assert_eq!(
            coll.path(),
            temp_dir.path().join("casbin").join("rules.dat")
        );
    }

    #[test]
    fn test_rejects_path_like_names() {
        let temp_dir = TempDir::new().unwrap();
        let client = FileClient::new(temp_dir.path());
        assert!(client.open("../escape", "rules").is_err());
        assert!(client.open("casbin", "").is_err());
        assert!(client.open("casbin", "a/b").is_err());
    }

    #[test]
    fn test_corrupted_file_fails_reads() {
        let temp_dir = TempDir::new().unwrap();
        let coll = FileClient::new(temp_dir.path())
            .open("casbin", "rules")
            .unwrap();
        DocumentStore::execute(
            &coll,
            StoreCommand::Insert {
                documents: vec![obj(json!({"ptype": "p", "v0": "alice"}))],
            },
        )
        .unwrap();

        let mut bytes = fs::read(coll.path()).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        fs::write(coll.path(), bytes).unwrap();

        let err = DocumentStore::execute(
            &coll,
            StoreCommand::Find {
                query: Default::default(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Corruption { .. }));
    }
}
