//! Query construction and evaluation.
//!
//! This module provides:
//! - [`QueryBuilder`] / [`PreparedQuery`]: turn raw list parameters into a
//!   resolved query and run it against a [`QueryableHandle`](crate::QueryableHandle)
//! - [`FilterEvaluator`]: evaluate filter expressions against documents
//! - ordering and projection helpers used by storage backends

mod builder;
mod filter;
mod shape;

pub use builder::{Page, PreparedQuery, QueryBuilder};
pub use filter::{extract_filter_fields, lookup, FilterEvaluator};
pub use shape::{compare_documents, compare_json, project, sort_documents, ID_FIELD};
