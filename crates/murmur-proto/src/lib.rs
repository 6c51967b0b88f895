//! murmur query IR.
//!
//! This crate defines the storage-independent types that list endpoints use
//! to describe a query: filter literals, filter expressions, sort and
//! projection specs, page windows and the raw query-string model they are
//! parsed from.
//!
//! # Modules
//!
//! - [`value`] - Filter literal values
//! - [`filter`] - Filter expression tree
//! - [`query`] - Sort, projection and the resolved query descriptor
//! - [`pagination`] - Page windows and pagination metadata
//! - [`request`] - Raw query-string parameters
//! - [`error`] - IR error types

pub mod error;
pub mod filter;
pub mod pagination;
pub mod query;
pub mod request;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use filter::FilterExpr;
pub use pagination::{Limit, PageWindow, PaginationMeta};
pub use query::{OrderDirection, OrderSpec, Projection, QueryDescriptor};
pub use request::{FilterOp, QueryParam, QueryRequest};
pub use value::Value;
