//! The queryable collection handle consumed by the query builder.

use async_trait::async_trait;
use murmur_proto::{FilterExpr, OrderSpec, Projection};

use crate::error::StorageError;

/// A stored document: a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// A handle over a stored collection that accumulates query operations
/// and runs them on [`execute`](QueryableHandle::execute) or
/// [`count`](QueryableHandle::count).
///
/// Refinement methods consume and return the handle, so a scoped base
/// handle can be cloned once per request and refined without affecting
/// other requests.
#[async_trait]
pub trait QueryableHandle: Clone + Send + Sync + 'static {
    /// AND a predicate into the handle's filter.
    fn and_where(self, predicate: FilterExpr) -> Self;

    /// Set the ordering. Earlier specs take priority.
    fn sort_by(self, order: Vec<OrderSpec>) -> Self;

    /// Skip the first `n` matching documents.
    fn skip(self, n: u64) -> Self;

    /// Return at most `n` documents.
    fn limit(self, n: u64) -> Self;

    /// Restrict the returned fields.
    fn select(self, projection: Projection) -> Self;

    /// Run the query and return the matching documents in order.
    async fn execute(&self) -> Result<Vec<Document>, StorageError>;

    /// Count documents matching the filter. Ordering, window and
    /// projection do not affect the count.
    async fn count(&self) -> Result<u64, StorageError>;
}
