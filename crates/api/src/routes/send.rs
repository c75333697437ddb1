//! Send routes: single notification, scheduled notification, and bulk
//! fan-out.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use courier_common::error::AppError;
use courier_common::types::{Audience, Channel, NotificationLog};
use courier_engine::fanout::BulkOutcome;
use courier_engine::store::{LogStore, NewLogEntry};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", post(send_notification))
        .route("/api/notifications/schedule", post(schedule_notification))
        .route("/api/notifications/bulk", post(send_bulk))
}

/// Normalize a request body into a validated entry. In-app requests may
/// omit `user_id`; the recipient is the owning user.
fn normalize(mut entry: NewLogEntry) -> NewLogEntry {
    if entry.channel == Channel::Notification && entry.user_id.is_none() {
        entry.user_id = Some(entry.recipient.clone());
    }
    entry
}

/// POST /api/notifications — Create a log entry and dispatch it immediately.
///
/// The response carries the delivery outcome: a provider failure comes
/// back as a `failed` row, not an HTTP error.
async fn send_notification(
    State(state): State<AppState>,
    Json(entry): Json<NewLogEntry>,
) -> Result<Json<NotificationLog>, AppError> {
    let entry = normalize(entry);
    if entry.scheduled_at.is_some() {
        return Err(AppError::Validation(
            "Use /api/notifications/schedule for deferred delivery".to_string(),
        ));
    }

    let created = LogStore::create(&state.pool, &entry).await?;
    let log = state.dispatcher.dispatch(&state.pool, created.id).await?;
    Ok(Json(log))
}

/// POST /api/notifications/schedule — Create a pending entry for later
/// dispatch by the scheduler. Nothing is sent now.
async fn schedule_notification(
    State(state): State<AppState>,
    Json(entry): Json<NewLogEntry>,
) -> Result<Json<NotificationLog>, AppError> {
    let entry = normalize(entry);
    if entry.scheduled_at.is_none() {
        return Err(AppError::Validation(
            "scheduled_at is required for scheduled notifications".to_string(),
        ));
    }

    let log = LogStore::create(&state.pool, &entry).await?;
    Ok(Json(log))
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    channels: Vec<Channel>,
    /// Symbolic audience name: all, customers, experts, admins.
    audience: Option<String>,
    /// Newline-delimited explicit recipients; mutually exclusive with
    /// `audience`.
    custom_recipients: Option<String>,
    message: String,
    #[serde(default)]
    scheduled_at: Option<DateTime<Utc>>,
}

impl BulkRequest {
    fn audience(&self) -> Result<Audience, AppError> {
        match (&self.audience, &self.custom_recipients) {
            (Some(_), Some(_)) => Err(AppError::Validation(
                "Provide either audience or custom_recipients, not both".to_string(),
            )),
            (Some(name), None) => Audience::symbolic(name),
            (None, Some(lines)) => Ok(Audience::custom_from_lines(lines)),
            (None, None) => Err(AppError::Validation(
                "Either audience or custom_recipients is required".to_string(),
            )),
        }
    }
}

/// POST /api/notifications/bulk — Fan one message out to an audience on
/// one or more channels.
///
/// Partial failure is a success response: per-recipient outcomes are in
/// the log, and the counts summarize them.
async fn send_bulk(
    State(state): State<AppState>,
    Json(request): Json<BulkRequest>,
) -> Result<Json<BulkOutcome>, AppError> {
    if request.scheduled_at.is_some() {
        return Err(AppError::Validation(
            "Bulk sends cannot be scheduled".to_string(),
        ));
    }

    let audience = request.audience()?;
    let outcome = state
        .fanout
        .submit_bulk(&state.pool, &request.channels, &audience, &request.message)
        .await?;

    Ok(Json(outcome))
}
