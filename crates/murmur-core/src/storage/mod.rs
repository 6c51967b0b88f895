//! Storage layer for murmur.
//!
//! This module provides a sled-based document store. Each collection is a
//! sled tree of JSON documents and doubles as a
//! [`QueryableHandle`](crate::QueryableHandle). Unique indexes live in
//! their own trees and are claimed in the same transaction as the insert.

mod collection;
mod config;
mod index;
mod store;

pub use collection::{timestamp_now, Collection, CREATED_AT, UPDATED_AT};
pub use config::StorageConfig;
pub use index::{UniqueIndex, INDEX_TREE_PREFIX};
pub use store::DocumentStore;
