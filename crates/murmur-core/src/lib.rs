//! murmur core - document storage and the query construction engine.
//!
//! List endpoints hand a scoped [`QueryableHandle`] and the raw request
//! parameters to a [`QueryBuilder`], chain the steps they need, and run the
//! resulting [`PreparedQuery`].

pub mod error;
pub mod handle;
pub mod query;
pub mod storage;

pub use error::{QueryError, StorageError};
pub use handle::{Document, QueryableHandle};
pub use query::{FilterEvaluator, Page, PreparedQuery, QueryBuilder};
pub use storage::{Collection, DocumentStore, StorageConfig, UniqueIndex};

/// Re-export query IR types.
pub use murmur_proto as proto;
