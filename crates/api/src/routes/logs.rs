//! Notification log routes: paginated view, CSV export, statistics,
//! and manual retry.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use courier_common::error::AppError;
use courier_common::types::{Channel, DeliveryStatus, NotificationLog};
use courier_engine::stats::StatsAggregator;
use courier_engine::store::{LogFilter, LogStore};

use crate::state::AppState;

/// Rows fetched per store round-trip while exporting.
const EXPORT_PAGE: i64 = 5_000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/logs", get(list_logs))
        .route("/api/logs/export", get(export_logs))
        .route("/api/logs/{id}/retry", post(retry_log))
        .route("/api/stats", get(get_stats))
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    channel: Option<Channel>,
    status: Option<DeliveryStatus>,
    search: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

impl LogQuery {
    fn into_filter(self) -> LogFilter {
        LogFilter {
            channel: self.channel,
            status: self.status,
            search: self.search,
            date_from: self.date_from,
            date_to: self.date_to,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// GET /api/logs — Filtered, paginated log view with total row count.
async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let filter = query.into_filter();
    let rows = LogStore::list(&state.pool, &filter).await?;
    let total = LogStore::count(&state.pool, &filter).await?;

    Ok(Json(serde_json::json!({ "rows": rows, "total": total })))
}

/// GET /api/logs/export — Download the filtered log as CSV.
///
/// Same filters as the list view; caller pagination is ignored and the
/// whole filtered set is exported, paged through the store until
/// exhausted. The body starts with a UTF-8 BOM so spreadsheet tools
/// detect the encoding.
async fn export_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = query.into_filter();
    filter.limit = EXPORT_PAGE;
    filter.offset = 0;

    let mut rows = Vec::new();
    loop {
        let page = LogStore::list(&state.pool, &filter).await?;
        let page_len = page.len() as i64;
        rows.extend(page);
        if page_len < EXPORT_PAGE {
            break;
        }
        filter.offset += EXPORT_PAGE;
    }

    let body = render_csv(&rows);
    let filename = format!("notification-logs-{}.csv", Utc::now().format("%Y-%m-%d"));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}

/// POST /api/logs/:id/retry — Reset a failed entry and re-dispatch it.
///
/// Retrying a sent entry is a no-op that returns it unchanged. A pending
/// row with `scheduled_at` in the future is likewise returned as-is: it
/// belongs to the scheduler and must not be sent before its time.
async fn retry_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<NotificationLog>, AppError> {
    let reset = LogStore::reset_for_retry(&state.pool, id).await?;

    let due_now = reset.scheduled_at.is_none_or(|at| at <= Utc::now());
    let log = if reset.status == DeliveryStatus::Pending && due_now {
        state.dispatcher.dispatch(&state.pool, id).await?
    } else {
        reset
    };

    Ok(Json(log))
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
}

/// GET /api/stats — Aggregate delivery counts over a creation-date range.
async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<courier_common::types::NotificationStats>, AppError> {
    let stats = StatsAggregator::aggregate(&state.pool, query.date_from, query.date_to).await?;
    Ok(Json(stats))
}

/// Render log rows as CSV with a UTF-8 BOM prefix.
fn render_csv(rows: &[NotificationLog]) -> String {
    let mut out = String::from("\u{feff}");
    out.push_str("ID,Type,Recipient,Message,Status,Created At,Sent At,Error Message\r\n");

    for row in rows {
        let fields = [
            row.id.to_string(),
            row.channel.to_string(),
            row.recipient.clone(),
            row.message.clone(),
            row.status.to_string(),
            format_timestamp(Some(row.created_at)),
            format_timestamp(row.sent_at),
            row.error_message.clone().unwrap_or_else(|| "-".to_string()),
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }

    out
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_field_plain_value_unquoted() {
        assert_eq!(csv_field("hello"), "hello");
        assert_eq!(csv_field("09120000000"), "09120000000");
    }

    #[test]
    fn test_csv_field_quotes_delimiters_and_newlines() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("line1\nline2"), "\"line1\nline2\"");
    }

    #[test]
    fn test_csv_field_escapes_embedded_quotes() {
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_render_csv_header_and_bom() {
        let csv = render_csv(&[]);
        assert!(csv.starts_with('\u{feff}'));
        assert!(csv.contains("ID,Type,Recipient,Message,Status,Created At,Sent At,Error Message"));
    }
}
