//! Unique secondary keys claimed atomically alongside document writes.

use std::fmt;
use std::sync::Arc;

use sled::transaction::TransactionResult;
use sled::Tree;

use super::collection::{from_transaction, key_for};
use crate::error::StorageError;

/// Tree name prefix for unique indexes. Trees starting with `__` are not
/// collections.
pub const INDEX_TREE_PREFIX: &str = "__unique/";

/// A sled tree mapping a unique key (e.g. a normalized email) to the id of
/// the document that owns it.
#[derive(Clone)]
pub struct UniqueIndex {
    name: Arc<str>,
    tree: Tree,
}

impl fmt::Debug for UniqueIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniqueIndex")
            .field("name", &self.name)
            .finish()
    }
}

impl UniqueIndex {
    pub(crate) fn new(name: &str, tree: Tree) -> Self {
        Self {
            name: Arc::from(name),
            tree,
        }
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Id of the document holding `key`, if any.
    pub fn owner(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.tree.get(key.as_bytes())?.and_then(|bytes| {
            uuid::Uuid::from_slice(&bytes).ok().map(|id| id.to_string())
        }))
    }

    /// Release `key` if it is held by `id`. Returns whether it was released.
    pub fn release(&self, key: &str, id: &str) -> Result<bool, StorageError> {
        let Some(id_key) = key_for(id) else {
            return Ok(false);
        };

        let result: TransactionResult<bool, StorageError> = self.tree.transaction(|claims| {
            match claims.get(key.as_bytes())? {
                Some(owner) if owner[..] == id_key[..] => {
                    claims.remove(key.as_bytes())?;
                    Ok(true)
                }
                _ => Ok(false),
            }
        });
        let released = result.map_err(from_transaction)?;
        tracing::debug!(index = %self.name, key, id, released, "unique key released");
        Ok(released)
    }

    /// Number of claimed keys.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether no key is claimed.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
