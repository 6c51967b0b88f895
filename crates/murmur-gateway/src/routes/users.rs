//! Account endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use murmur_core::proto::FilterExpr;
use murmur_core::storage::timestamp_now;
use murmur_core::{Collection, Document, QueryableHandle, StorageError};
use serde_json::Value;

use super::list_page;
use crate::error::AppError;
use crate::json::{ListQuery, ListResponse, SavedPostToggle, SuccessResponse};
use crate::AppState;

/// Fields a list request may search.
const SEARCH_FIELDS: &[&str] = &["name", "email", "username"];

/// Fields a client may not supply when creating an account.
const CREATE_REJECTED: &[&str] = &["_id", "role", "password", "isDeleted", "deletedAt"];

/// Fields a profile update may not touch.
const UPDATE_REJECTED: &[&str] = &[
    "_id",
    "role",
    "email",
    "password",
    "isDeleted",
    "deletedAt",
    "savedPosts",
    "createdAt",
    "updatedAt",
];

const SAVED_POSTS: &str = "savedPosts";
const IS_DELETED: &str = "isDeleted";

/// Account role stored in the `role` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    User,
    Admin,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/admins", get(list_admins).post(create_admin))
        .route(
            "/users/:id",
            get(get_account).patch(update_account).delete(delete_account),
        )
        .route("/users/:id/saved-posts", get(saved_posts))
        .route("/users/:id/saved-posts/:post_id", post(toggle_saved_post))
}

/// Live (not soft-deleted) accounts with the given role.
fn accounts(users: &Collection, role: Role) -> Collection {
    users
        .clone()
        .and_where(FilterExpr::eq("role", role.as_str()))
        .and_where(FilterExpr::ne(IS_DELETED, true))
}

fn is_deleted(doc: &Document) -> bool {
    doc.get(IS_DELETED).and_then(Value::as_bool).unwrap_or(false)
}

/// Fetch an account that has not been soft-deleted.
fn live_account(state: &AppState, id: &str) -> Result<Document, AppError> {
    match state.users.get(id)? {
        Some(doc) if !is_deleted(&doc) => Ok(doc),
        _ => Err(AppError::NotFound(format!("account '{id}' not found"))),
    }
}

fn reject_fields(body: &Document, fields: &[&str]) -> Result<(), AppError> {
    match fields.iter().find(|f| body.contains_key(**f)) {
        Some(field) => Err(AppError::BadRequest(format!("field '{field}' cannot be set"))),
        None => Ok(()),
    }
}

fn required_string(body: &Document, field: &str) -> Result<String, AppError> {
    match body.get(field).and_then(Value::as_str).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(AppError::BadRequest(format!("'{field}' is required"))),
    }
}

fn saved_post_ids(doc: &Document) -> Vec<String> {
    match doc.get(SAVED_POSTS) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

async fn list_users(
    State(state): State<AppState>,
    ListQuery(request): ListQuery,
) -> Result<Json<ListResponse>, AppError> {
    let handle = accounts(&state.users, Role::User);
    Ok(Json(list_page(handle, &request, SEARCH_FIELDS, &state.config).await?))
}

async fn list_admins(
    State(state): State<AppState>,
    ListQuery(request): ListQuery,
) -> Result<Json<ListResponse>, AppError> {
    let handle = accounts(&state.users, Role::Admin);
    Ok(Json(list_page(handle, &request, SEARCH_FIELDS, &state.config).await?))
}

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<Document>,
) -> Result<(StatusCode, Json<SuccessResponse<Document>>), AppError> {
    create_account(&state, Role::User, body)
}

async fn create_admin(
    State(state): State<AppState>,
    Json(body): Json<Document>,
) -> Result<(StatusCode, Json<SuccessResponse<Document>>), AppError> {
    create_account(&state, Role::Admin, body)
}

fn create_account(
    state: &AppState,
    role: Role,
    mut body: Document,
) -> Result<(StatusCode, Json<SuccessResponse<Document>>), AppError> {
    reject_fields(&body, CREATE_REJECTED)?;
    let name = required_string(&body, "name")?;
    let email = required_string(&body, "email")?.to_lowercase();
    if !email.contains('@') {
        return Err(AppError::BadRequest(format!("'{email}' is not an email address")));
    }

    body.insert("name".to_string(), Value::String(name));
    body.insert("email".to_string(), Value::String(email.clone()));
    body.insert("role".to_string(), Value::String(role.as_str().to_string()));
    body.insert(IS_DELETED.to_string(), Value::Bool(false));
    body.entry(SAVED_POSTS.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));

    let doc = match state.users.insert_unique(body, &state.emails, &email) {
        Ok(doc) => doc,
        Err(StorageError::Conflict(_)) => {
            return Err(AppError::Conflict(format!("email '{email}' is already registered")));
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(id = ?doc.get("_id"), role = role.as_str(), "account created");
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(doc))))
}

async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse<Document>>, AppError> {
    Ok(Json(SuccessResponse::new(live_account(&state, &id)?)))
}

async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Document>,
) -> Result<Json<SuccessResponse<Document>>, AppError> {
    reject_fields(&patch, UPDATE_REJECTED)?;
    if patch.is_empty() {
        return Err(AppError::BadRequest("update body is empty".to_string()));
    }
    live_account(&state, &id)?;

    let fields: Vec<String> = patch.keys().cloned().collect();
    let doc = state
        .users
        .update(&id, patch)?
        .ok_or_else(|| AppError::NotFound(format!("account '{id}' not found")))?;
    tracing::info!(%id, ?fields, "account updated");
    Ok(Json(SuccessResponse::new(doc)))
}

async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse<Document>>, AppError> {
    live_account(&state, &id)?;

    let deleted_at = timestamp_now();
    let doc = state
        .users
        .modify(&id, |doc| {
            doc.insert(IS_DELETED.to_string(), Value::Bool(true));
            doc.insert("deletedAt".to_string(), Value::String(deleted_at.clone()));
        })?
        .ok_or_else(|| AppError::NotFound(format!("account '{id}' not found")))?;
    if let Some(email) = doc.get("email").and_then(Value::as_str) {
        state.emails.release(email, &id)?;
    }
    tracing::info!(%id, "account soft-deleted");
    Ok(Json(SuccessResponse::new(doc)))
}

async fn saved_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse<Vec<String>>>, AppError> {
    let doc = live_account(&state, &id)?;
    Ok(Json(SuccessResponse::new(saved_post_ids(&doc))))
}

async fn toggle_saved_post(
    State(state): State<AppState>,
    Path((id, post_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse<SavedPostToggle>>, AppError> {
    live_account(&state, &id)?;

    let mut saved = false;
    let doc = state
        .users
        .modify(&id, |doc| {
            let mut posts = match doc.remove(SAVED_POSTS) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            let before = posts.len();
            posts.retain(|p| p.as_str() != Some(post_id.as_str()));
            saved = posts.len() == before;
            if saved {
                posts.push(Value::String(post_id.clone()));
            }
            doc.insert(SAVED_POSTS.to_string(), Value::Array(posts));
        })?
        .ok_or_else(|| AppError::NotFound(format!("account '{id}' not found")))?;

    tracing::debug!(%id, %post_id, saved, "saved post toggled");
    Ok(Json(SuccessResponse::new(SavedPostToggle {
        saved,
        saved_posts: saved_post_ids(&doc),
    })))
}
