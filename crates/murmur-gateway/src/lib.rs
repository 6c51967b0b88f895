//! murmur HTTP/JSON Gateway.
//!
//! Exposes account and notification collections over REST. Every list
//! endpoint is driven by the query builder in `murmur-core`, so all of them
//! accept the same `searchTerm`, `sort`, `page`, `limit`, `fields` and
//! filter parameters and answer with the same `{ success, data, meta }`
//! envelope.

pub mod config;
pub mod error;
pub mod json;
pub mod publisher;
pub mod routes;

pub use config::{Args, GatewayConfig};
pub use error::AppError;
pub use publisher::{
    BroadcastPublisher, NotificationEvent, NotificationEventKind, NotificationPublisher,
};

use std::sync::Arc;

use axum::Router;
use murmur_core::{Collection, DocumentStore, StorageError, UniqueIndex};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Collection holding user and admin accounts.
pub const USERS_COLLECTION: &str = "users";
/// Collection holding notification records.
pub const NOTIFICATIONS_COLLECTION: &str = "notifications";
/// Unique index over live account emails.
pub const EMAIL_INDEX: &str = "users.email";

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Document store.
    pub store: DocumentStore,
    /// Account documents.
    pub users: Collection,
    /// Emails claimed by live accounts.
    pub emails: UniqueIndex,
    /// Notification documents.
    pub notifications: Collection,
    /// Real-time notification sink.
    pub publisher: Arc<dyn NotificationPublisher>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl AppState {
    /// Create new application state over an open store.
    pub fn new(
        store: DocumentStore,
        config: GatewayConfig,
        publisher: Arc<dyn NotificationPublisher>,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            users: store.collection(USERS_COLLECTION)?,
            emails: store.unique_index(EMAIL_INDEX)?,
            notifications: store.collection(NOTIFICATIONS_COLLECTION)?,
            store,
            publisher,
            config,
        })
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::users::routes())
        .merge(routes::notifications::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
