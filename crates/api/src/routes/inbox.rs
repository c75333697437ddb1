//! Per-user inbox routes over in-app notifications.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use courier_common::error::AppError;
use courier_common::types::{InboxFilter, NotificationLog};
use courier_engine::inbox::InboxService;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/inbox/{user_id}", get(list_inbox))
        .route("/api/inbox/{user_id}/unread-count", get(unread_count))
        .route("/api/inbox/{user_id}/read/{id}", post(mark_read))
        .route("/api/inbox/{user_id}/read-all", post(mark_all_read))
        .route("/api/inbox/{user_id}/items/{id}", delete(delete_item))
        .route("/api/inbox/{user_id}/read", delete(delete_all_read))
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
struct InboxQuery {
    #[serde(default)]
    filter: InboxFilter,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

/// GET /api/inbox/:user_id — List a user's inbox items, newest first.
async fn list_inbox(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<Vec<NotificationLog>>, AppError> {
    let items = InboxService::list(
        &state.pool,
        &user_id,
        query.filter,
        query.limit,
        query.offset,
    )
    .await?;
    Ok(Json(items))
}

/// GET /api/inbox/:user_id/unread-count — Unread badge counter.
async fn unread_count(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let count = InboxService::unread_count(&state.pool, &user_id).await?;
    Ok(Json(serde_json::json!({ "unread": count })))
}

/// POST /api/inbox/:user_id/read/:id — Mark one item read.
async fn mark_read(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(String, i64)>,
) -> Result<Json<NotificationLog>, AppError> {
    let item = InboxService::mark_read(&state.pool, &user_id, id).await?;
    Ok(Json(item))
}

/// POST /api/inbox/:user_id/read-all — Mark every unread item read.
async fn mark_all_read(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let marked = InboxService::mark_all_read(&state.pool, &user_id).await?;
    Ok(Json(serde_json::json!({ "marked": marked })))
}

/// DELETE /api/inbox/:user_id/items/:id — Remove one item.
async fn delete_item(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(String, i64)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = InboxService::delete(&state.pool, &user_id, id).await?;
    if deleted {
        Ok(Json(serde_json::json!({ "deleted": true })))
    } else {
        Err(AppError::NotFound(format!("Inbox item {} not found", id)))
    }
}

/// DELETE /api/inbox/:user_id/read — Remove every read item.
async fn delete_all_read(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = InboxService::delete_all_read(&state.pool, &user_id).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
