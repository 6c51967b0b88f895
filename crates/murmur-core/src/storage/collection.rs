//! A named collection of JSON documents in one sled tree.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use murmur_proto::{FilterExpr, OrderSpec, Projection};
use serde_json::Value as Json;
use sled::transaction::{abort, TransactionError, TransactionResult};
use sled::{Transactional, Tree};
use uuid::Uuid;

use super::UniqueIndex;
use crate::error::StorageError;
use crate::handle::{Document, QueryableHandle};
use crate::query::{project, sort_documents, FilterEvaluator, ID_FIELD};

/// Creation timestamp field set on insert.
pub const CREATED_AT: &str = "createdAt";

/// Modification timestamp field refreshed on every write.
pub const UPDATED_AT: &str = "updatedAt";

/// Current time in the stored timestamp format (RFC 3339, UTC, millis).
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Query operations accumulated on a collection handle.
#[derive(Debug, Clone, Default)]
struct ScanPlan {
    filter: Option<FilterExpr>,
    order_by: Vec<OrderSpec>,
    skip: u64,
    limit: Option<u64>,
    projection: Option<Projection>,
}

/// A collection of documents keyed by time-ordered UUID.
///
/// Keys are UUID v7 bytes, so tree order is insertion order; that order is
/// the final tie-break for sorted results.
#[derive(Clone)]
pub struct Collection {
    name: Arc<str>,
    tree: Tree,
    plan: ScanPlan,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("plan", &self.plan)
            .finish()
    }
}

impl Collection {
    pub(crate) fn new(name: &str, tree: Tree) -> Self {
        Self {
            name: Arc::from(name),
            tree,
            plan: ScanPlan::default(),
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored documents, ignoring any accumulated filter.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Insert a new document.
    ///
    /// Assigns `_id` and `updatedAt`; `createdAt` is assigned unless the
    /// document already carries one as a string.
    pub fn insert(&self, doc: Document) -> Result<Document, StorageError> {
        let (id, doc) = stamp_new(doc);
        self.tree.insert(&id.as_bytes()[..], serde_json::to_vec(&doc)?)?;
        tracing::debug!(collection = %self.name, id = %id, "document inserted");
        Ok(doc)
    }

    /// Insert a new document and claim `key` in `index` for it, in one
    /// transaction. Fails with [`StorageError::Conflict`] and writes nothing
    /// if the key is already held.
    pub fn insert_unique(
        &self,
        doc: Document,
        index: &UniqueIndex,
        key: &str,
    ) -> Result<Document, StorageError> {
        let (id, doc) = stamp_new(doc);
        let bytes = serde_json::to_vec(&doc)?;

        let result: TransactionResult<(), StorageError> =
            (&self.tree, index.tree()).transaction(|(docs, claims)| {
                if claims.get(key.as_bytes())?.is_some() {
                    return abort(StorageError::Conflict(format!(
                        "'{key}' is already taken in {}",
                        index.name()
                    )));
                }
                claims.insert(key.as_bytes(), &id.as_bytes()[..])?;
                docs.insert(&id.as_bytes()[..], bytes.as_slice())?;
                Ok(())
            });
        result.map_err(from_transaction)?;

        tracing::debug!(
            collection = %self.name,
            index = index.name(),
            id = %id,
            "document inserted with unique key"
        );
        Ok(doc)
    }

    /// Fetch a document by id. Unknown or malformed ids yield `None`.
    pub fn get(&self, id: &str) -> Result<Option<Document>, StorageError> {
        let Some(key) = key_for(id) else {
            return Ok(None);
        };
        self.tree
            .get(key)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Atomically modify one document in place.
    ///
    /// `f` may run more than once under contention. `_id` and `createdAt`
    /// are restored after `f` runs and `updatedAt` is refreshed. Returns the
    /// stored result, or `None` if the document does not exist.
    pub fn modify<F>(&self, id: &str, mut f: F) -> Result<Option<Document>, StorageError>
    where
        F: FnMut(&mut Document),
    {
        let Some(key) = key_for(id) else {
            return Ok(None);
        };

        let mut failure: Option<StorageError> = None;
        let updated = self.tree.update_and_fetch(key, |old| {
            let bytes = old?;
            failure = None;
            let mut doc = match decode(bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    failure = Some(e);
                    return Some(bytes.to_vec());
                }
            };

            let id = doc.get(ID_FIELD).cloned();
            let created = doc.get(CREATED_AT).cloned();
            f(&mut doc);
            for (field, value) in [(ID_FIELD, id), (CREATED_AT, created)] {
                match value {
                    Some(v) => doc.insert(field.to_string(), v),
                    None => doc.remove(field),
                };
            }
            doc.insert(UPDATED_AT.to_string(), Json::String(timestamp_now()));

            match serde_json::to_vec(&doc) {
                Ok(encoded) => Some(encoded),
                Err(e) => {
                    failure = Some(e.into());
                    Some(bytes.to_vec())
                }
            }
        })?;

        if let Some(err) = failure {
            return Err(err);
        }
        updated.map(|bytes| decode(&bytes)).transpose()
    }

    /// Merge `patch` into a document's top-level fields.
    pub fn update(&self, id: &str, patch: Document) -> Result<Option<Document>, StorageError> {
        if let Some(field) = [ID_FIELD, CREATED_AT].into_iter().find(|f| patch.contains_key(*f)) {
            return Err(StorageError::Rejected(format!("'{field}' cannot be modified")));
        }
        let updated = self.modify(id, |doc| {
            for (field, value) in &patch {
                doc.insert(field.clone(), value.clone());
            }
        })?;
        tracing::debug!(collection = %self.name, id, found = updated.is_some(), "document updated");
        Ok(updated)
    }

    /// Remove a document. Returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let Some(key) = key_for(id) else {
            return Ok(false);
        };
        let removed = self.tree.remove(key)?.is_some();
        tracing::debug!(collection = %self.name, id, removed, "document deleted");
        Ok(removed)
    }

    /// First document (in storage order) matching `filter`. The scan runs
    /// on the blocking pool.
    pub async fn find_one(&self, filter: &FilterExpr) -> Result<Option<Document>, StorageError> {
        let tree = self.tree.clone();
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || matching(&tree, Some(&filter)).next().transpose())
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

/// Assign `_id` and timestamps to a document about to be inserted.
fn stamp_new(mut doc: Document) -> (Uuid, Document) {
    let id = Uuid::now_v7();
    let now = timestamp_now();

    doc.insert(ID_FIELD.to_string(), Json::String(id.to_string()));
    if !matches!(doc.get(CREATED_AT), Some(Json::String(_))) {
        doc.insert(CREATED_AT.to_string(), Json::String(now.clone()));
    }
    doc.insert(UPDATED_AT.to_string(), Json::String(now));
    (id, doc)
}

pub(crate) fn key_for(id: &str) -> Option<[u8; 16]> {
    Uuid::parse_str(id).ok().map(|uuid| *uuid.as_bytes())
}

pub(crate) fn from_transaction(err: TransactionError<StorageError>) -> StorageError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => StorageError::Sled(e),
    }
}

fn decode(bytes: &[u8]) -> Result<Document, StorageError> {
    match serde_json::from_slice::<Json>(bytes)? {
        Json::Object(doc) => Ok(doc),
        other => Err(StorageError::InvalidData(format!(
            "stored value is not an object: {other}"
        ))),
    }
}

/// Documents in storage order that match `filter`. Decode errors are
/// yielded, never skipped.
fn matching<'a>(
    tree: &'a Tree,
    filter: Option<&'a FilterExpr>,
) -> impl Iterator<Item = Result<Document, StorageError>> + 'a {
    tree.iter()
        .map(|item| {
            let (_, bytes) = item?;
            decode(&bytes)
        })
        .filter(move |res| match (res, filter) {
            (Ok(doc), Some(filter)) => FilterEvaluator::evaluate(filter, doc),
            _ => true,
        })
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

impl ScanPlan {
    fn run(&self, tree: &Tree) -> Result<Vec<Document>, StorageError> {
        let skip = to_usize(self.skip);
        let take = self.limit.map(to_usize).unwrap_or(usize::MAX);

        let docs: Vec<Document> = if self.order_by.is_empty() {
            matching(tree, self.filter.as_ref())
                .skip(skip)
                .take(take)
                .collect::<Result<_, _>>()?
        } else {
            let mut all = matching(tree, self.filter.as_ref()).collect::<Result<Vec<_>, _>>()?;
            sort_documents(&mut all, &self.order_by);
            all.into_iter().skip(skip).take(take).collect()
        };

        Ok(match &self.projection {
            Some(projection) => docs.into_iter().map(|d| project(d, projection)).collect(),
            None => docs,
        })
    }

    fn count(&self, tree: &Tree) -> Result<u64, StorageError> {
        let mut total = 0u64;
        for doc in matching(tree, self.filter.as_ref()) {
            doc?;
            total += 1;
        }
        Ok(total)
    }
}

#[async_trait]
impl QueryableHandle for Collection {
    fn and_where(mut self, predicate: FilterExpr) -> Self {
        self.plan.filter = FilterExpr::merge(self.plan.filter.take(), predicate);
        self
    }

    fn sort_by(mut self, order: Vec<OrderSpec>) -> Self {
        self.plan.order_by = order;
        self
    }

    fn skip(mut self, n: u64) -> Self {
        self.plan.skip = n;
        self
    }

    fn limit(mut self, n: u64) -> Self {
        self.plan.limit = Some(n);
        self
    }

    fn select(mut self, projection: Projection) -> Self {
        self.plan.projection = Some(projection);
        self
    }

    async fn execute(&self) -> Result<Vec<Document>, StorageError> {
        let tree = self.tree.clone();
        let plan = self.plan.clone();
        let docs = tokio::task::spawn_blocking(move || plan.run(&tree))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        tracing::debug!(collection = %self.name, returned = docs.len(), "scan executed");
        Ok(docs)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let tree = self.tree.clone();
        let plan = self.plan.clone();
        tokio::task::spawn_blocking(move || plan.count(&tree))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}
