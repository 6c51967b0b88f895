//! Document store wrapping sled.

use sled::Db;

use super::{Collection, StorageConfig, UniqueIndex, INDEX_TREE_PREFIX};
use crate::error::StorageError;

/// A sled database holding one tree per collection.
#[derive(Clone)]
pub struct DocumentStore {
    db: Db,
}

impl DocumentStore {
    /// Open or create a store with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, StorageError> {
        let db = config.to_sled_config().open()?;
        tracing::debug!(
            path = %config.path.display(),
            temporary = config.temporary,
            recovered = db.was_recovered(),
            "document store opened"
        );
        Ok(Self { db })
    }

    /// Open a collection, creating it if needed.
    pub fn collection(&self, name: &str) -> Result<Collection, StorageError> {
        let tree = self.db.open_tree(name)?;
        Ok(Collection::new(name, tree))
    }

    /// Open a unique index, creating it if needed.
    pub fn unique_index(&self, name: &str) -> Result<UniqueIndex, StorageError> {
        let tree = self.db.open_tree(format!("{INDEX_TREE_PREFIX}{name}"))?;
        Ok(UniqueIndex::new(name, tree))
    }

    /// Names of collections that have been opened at least once. Internal
    /// trees (sled's default tree, unique indexes) are skipped.
    pub fn collection_names(&self) -> Vec<String> {
        self.db
            .tree_names()
            .into_iter()
            .filter(|name| !name.starts_with(b"__"))
            .map(|name| String::from_utf8_lossy(&name).into_owned())
            .collect()
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<usize, StorageError> {
        Ok(self.db.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_temporary_and_collections() {
        let store = DocumentStore::open(StorageConfig::temporary()).unwrap();
        store.collection("users").unwrap();
        store.collection("notifications").unwrap();
        store.unique_index("users.email").unwrap();

        let mut names = store.collection_names();
        names.sort();
        assert_eq!(names, vec!["notifications".to_string(), "users".to_string()]);
    }

    #[test]
    fn test_reopen_persists_documents() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = DocumentStore::open(StorageConfig::new(dir.path())).unwrap();
            let users = store.collection("users").unwrap();
            let doc = users
                .insert(serde_json::json!({"name": "Ada"}).as_object().cloned().unwrap())
                .unwrap();
            store.flush().unwrap();
            doc["_id"].as_str().unwrap().to_string()
        };

        let store = DocumentStore::open(StorageConfig::new(dir.path())).unwrap();
        let users = store.collection("users").unwrap();
        let doc = users.get(&id).unwrap().unwrap();
        assert_eq!(doc["name"], "Ada");
    }
}
