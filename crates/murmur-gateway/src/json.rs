//! JSON request and response types for the HTTP gateway.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use murmur_core::{Document, Page};
use murmur_proto::{PaginationMeta, QueryRequest};
use serde::Serialize;

use crate::error::AppError;

/// Generic success response wrapper.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    /// Success flag.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    /// Create a new success response.
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// Success flag.
    pub success: bool,
    /// Documents in the requested window.
    pub data: Vec<Document>,
    /// Pagination metadata for the whole match set.
    pub meta: PaginationMeta,
}

impl From<Page> for ListResponse {
    fn from(page: Page) -> Self {
        Self {
            success: true,
            data: page.data,
            meta: page.meta,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status.
    pub status: String,
    /// Gateway version.
    pub version: String,
    /// Collections present in the store.
    pub collections: Vec<String>,
}

/// Result of toggling a saved post.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPostToggle {
    /// Whether the post is saved after the toggle.
    pub saved: bool,
    /// The account's saved post ids.
    pub saved_posts: Vec<String>,
}

/// Query string of a list endpoint, decoded as ordered pairs so that
/// repeated and bracketed keys survive.
#[derive(Debug, Clone)]
pub struct ListQuery(pub QueryRequest);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ListQuery {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::InvalidQuery(e.body_text()))?;
        Ok(ListQuery(QueryRequest::from_pairs(pairs)?))
    }
}
