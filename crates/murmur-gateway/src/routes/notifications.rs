//! Notification endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use murmur_core::Document;
use serde_json::Value;

use super::list_page;
use crate::error::AppError;
use crate::json::{ListQuery, ListResponse, SuccessResponse};
use crate::publisher::{NotificationEvent, NotificationEventKind};
use crate::AppState;

/// Fields a list request may search.
const SEARCH_FIELDS: &[&str] = &["title", "message"];

const REQUIRED_FIELDS: &[&str] = &["receiver", "title", "message"];

/// Notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/notifications/:id/read", patch(mark_read))
}

async fn list_notifications(
    State(state): State<AppState>,
    ListQuery(request): ListQuery,
) -> Result<Json<ListResponse>, AppError> {
    let handle = state.notifications.clone();
    Ok(Json(list_page(handle, &request, SEARCH_FIELDS, &state.config).await?))
}

/// Store a notification, then fan it out to subscribers.
async fn create_notification(
    State(state): State<AppState>,
    Json(mut body): Json<Document>,
) -> Result<(StatusCode, Json<SuccessResponse<Document>>), AppError> {
    for field in REQUIRED_FIELDS {
        match body.get(*field).and_then(Value::as_str) {
            Some(v) if !v.trim().is_empty() => {}
            _ => return Err(AppError::BadRequest(format!("'{field}' is required"))),
        }
    }
    if body.contains_key("_id") {
        return Err(AppError::BadRequest("field '_id' cannot be set".to_string()));
    }
    body.insert("read".to_string(), Value::Bool(false));

    let doc = state.notifications.insert(body)?;
    state
        .publisher
        .publish(&NotificationEvent::new(NotificationEventKind::Created, doc.clone()));
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(doc))))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse<Document>>, AppError> {
    let doc = state
        .notifications
        .modify(&id, |doc| {
            doc.insert("read".to_string(), Value::Bool(true));
        })?
        .ok_or_else(|| AppError::NotFound(format!("notification '{id}' not found")))?;

    state
        .publisher
        .publish(&NotificationEvent::new(NotificationEventKind::Read, doc.clone()));
    Ok(Json(SuccessResponse::new(doc)))
}
