//! NotificationLog store — durable record of every delivery attempt.
//!
//! Every component reads and writes through this service; log state is never
//! cached across calls. All lifecycle transitions are single conditional
//! UPDATEs (compare-and-set on `status`), which is what keeps a concurrent
//! retry and a scheduler tick from double-recording the same attempt.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;

use courier_common::error::AppError;
use courier_common::types::{
    Channel, DeliveryStatus, NotificationLog, NotificationStats, RecipientAddress,
};

/// Parameters for creating a new log entry.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewLogEntry {
    pub channel: Channel,
    pub recipient: String,
    pub message: String,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Owning user; required for the `notification` channel, forbidden otherwise.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl NewLogEntry {
    pub fn new(channel: Channel, recipient: impl Into<String>, message: impl Into<String>) -> Self {
        let recipient = recipient.into();
        let user_id = match channel {
            Channel::Notification => Some(recipient.clone()),
            _ => None,
        };
        Self {
            channel,
            recipient,
            message: message.into(),
            scheduled_at: None,
            user_id,
            title: None,
            link: None,
        }
    }

    /// Build an entry from a resolver-classified address.
    pub fn from_address(
        channel: Channel,
        address: &RecipientAddress,
        message: impl Into<String>,
    ) -> Self {
        Self::new(channel, address.as_str(), message)
    }

    pub fn scheduled(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// Reject malformed entries before any row is created.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.message.trim().is_empty() {
            return Err(AppError::Validation("Message must not be empty".to_string()));
        }
        if self.recipient.trim().is_empty() {
            return Err(AppError::Validation(
                "Recipient must not be empty".to_string(),
            ));
        }

        match self.channel {
            Channel::Notification => {
                if self.user_id.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    return Err(AppError::Validation(
                        "In-app notifications require a user_id".to_string(),
                    ));
                }
            }
            channel => {
                if self.user_id.is_some() {
                    return Err(AppError::Validation(format!(
                        "user_id is only meaningful for the notification channel, not {}",
                        channel
                    )));
                }
                let shape = RecipientAddress::detect(&self.recipient);
                if !shape.is_some_and(|s| s.fits_channel(channel)) {
                    return Err(AppError::Validation(format!(
                        "Recipient '{}' does not match the {} channel",
                        self.recipient, channel
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Filters for the paginated log view. All fields optional; dates are
/// inclusive whole days on `created_at`.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub channel: Option<Channel>,
    pub status: Option<DeliveryStatus>,
    /// Substring match on recipient OR message.
    pub search: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: i64,
    pub offset: i64,
}

impl LogFilter {
    fn created_from(&self) -> Option<DateTime<Utc>> {
        self.date_from.map(day_start)
    }

    fn created_until(&self) -> Option<DateTime<Utc>> {
        self.date_to.map(day_end_exclusive)
    }

    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", like_escape(s)))
    }
}

/// First instant of a calendar day, UTC.
pub(crate) fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Exclusive upper bound for an inclusive calendar day, UTC.
pub(crate) fn day_end_exclusive(date: NaiveDate) -> DateTime<Utc> {
    day_start(date.checked_add_days(Days::new(1)).unwrap_or(date))
}

/// Escape LIKE metacharacters in a user-supplied search term.
fn like_escape(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Service layer for notification log persistence.
pub struct LogStore;

impl LogStore {
    /// Create a single pending entry. Validation happens first, so an
    /// invalid request leaves no row behind.
    pub async fn create(pool: &PgPool, entry: &NewLogEntry) -> Result<NotificationLog, AppError> {
        entry.validate()?;

        let log: NotificationLog = sqlx::query_as(
            r#"
            INSERT INTO notification_logs
                (channel, recipient, message, status, scheduled_at, user_id, title, link)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(entry.channel)
        .bind(&entry.recipient)
        .bind(&entry.message)
        .bind(entry.scheduled_at)
        .bind(&entry.user_id)
        .bind(&entry.title)
        .bind(&entry.link)
        .fetch_one(pool)
        .await?;

        tracing::info!(
            log_id = log.id,
            channel = %log.channel,
            scheduled = log.scheduled_at.is_some(),
            "Notification log created"
        );

        Ok(log)
    }

    /// Create a batch of pending entries, submitted before any dispatch so
    /// an interrupted fan-out leaves a resumable set of pending rows.
    pub async fn create_batch(
        pool: &PgPool,
        entries: &[NewLogEntry],
    ) -> Result<Vec<i64>, AppError> {
        for entry in entries {
            entry.validate()?;
        }

        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let log = Self::create(pool, entry).await?;
            ids.push(log.id);
        }
        Ok(ids)
    }

    /// Get a single entry by id.
    pub async fn get(pool: &PgPool, id: i64) -> Result<NotificationLog, AppError> {
        let log: NotificationLog = sqlx::query_as("SELECT * FROM notification_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification log {} not found", id)))?;

        Ok(log)
    }

    /// Filtered, paginated log view, newest first.
    pub async fn list(pool: &PgPool, filter: &LogFilter) -> Result<Vec<NotificationLog>, AppError> {
        let logs: Vec<NotificationLog> = sqlx::query_as(
            r#"
            SELECT * FROM notification_logs
            WHERE ($1::text IS NULL OR channel = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR recipient ILIKE $3 OR message ILIKE $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(filter.channel)
        .bind(filter.status)
        .bind(filter.search_pattern())
        .bind(filter.created_from())
        .bind(filter.created_until())
        .bind(filter.limit.max(0))
        .bind(filter.offset.max(0))
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }

    /// Total row count for the same filters (pagination).
    pub async fn count(pool: &PgPool, filter: &LogFilter) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM notification_logs
            WHERE ($1::text IS NULL OR channel = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR recipient ILIKE $3 OR message ILIKE $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            "#,
        )
        .bind(filter.channel)
        .bind(filter.status)
        .bind(filter.search_pattern())
        .bind(filter.created_from())
        .bind(filter.created_until())
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Record a successful delivery. Only wins if the row is still
    /// `pending`; returns whether this caller made the transition.
    pub async fn mark_sent(pool: &PgPool, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notification_logs
            SET status = 'sent', sent_at = now(), error_message = NULL
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a failed delivery with the provider detail. Same CAS rule as
    /// [`Self::mark_sent`].
    pub async fn mark_failed(pool: &PgPool, id: i64, detail: &str) -> Result<bool, AppError> {
        let detail = if detail.trim().is_empty() {
            "send failed"
        } else {
            detail
        };

        let result = sqlx::query(
            r#"
            UPDATE notification_logs
            SET status = 'failed', error_message = $2, sent_at = NULL
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(detail)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reset a failed entry for another dispatch attempt: `failed →
    /// pending`, error cleared, claim released. Channel, recipient and
    /// message are untouched.
    ///
    /// A `sent` entry is returned unchanged — retrying it is an idempotent
    /// no-op, not an error. A `pending` entry is likewise returned as-is.
    pub async fn reset_for_retry(pool: &PgPool, id: i64) -> Result<NotificationLog, AppError> {
        let current = Self::get(pool, id).await?;
        if current.status != DeliveryStatus::Failed {
            return Ok(current);
        }

        let updated: Option<NotificationLog> = sqlx::query_as(
            r#"
            UPDATE notification_logs
            SET status = 'pending', error_message = NULL, sent_at = NULL, claimed_at = NULL
            WHERE id = $1 AND status = 'failed'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let log = match updated {
            Some(log) => {
                tracing::info!(log_id = id, "Notification reset for retry");
                log
            }
            // Lost a race with a concurrent transition; report the row as it is now.
            None => Self::get(pool, id).await?,
        };

        Ok(log)
    }

    /// Atomically claim due scheduled entries.
    ///
    /// Each returned row was moved out of the claimable set by this call;
    /// with two schedulers ticking concurrently, a given row is handed to
    /// at most one of them (`FOR UPDATE SKIP LOCKED` + the `claimed_at`
    /// NULL check). Losing the race is silent — the row is simply absent
    /// from the result.
    pub async fn claim_due(
        pool: &PgPool,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<NotificationLog>, AppError> {
        let claimed: Vec<NotificationLog> = sqlx::query_as(
            r#"
            UPDATE notification_logs
            SET claimed_at = now()
            WHERE id IN (
                SELECT id FROM notification_logs
                WHERE status = 'pending'
                  AND scheduled_at IS NOT NULL
                  AND scheduled_at <= $1
                  AND claimed_at IS NULL
                ORDER BY scheduled_at ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(claimed)
    }

    /// Aggregate delivery counts restricted to a `created_at` range.
    /// Read-only; `sent + failed + pending == total` always holds for the
    /// filtered set.
    pub async fn stats(
        pool: &PgPool,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<NotificationStats, AppError> {
        let stats: NotificationStats = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'sent')   AS sent,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE channel = 'sms' AND status = 'sent') AS sms_sent,
                COUNT(*) FILTER (WHERE channel = 'telegram' AND status = 'sent') AS telegram_sent,
                COUNT(*) FILTER (WHERE channel = 'email' AND status = 'sent') AS email_sent,
                COUNT(*) FILTER (WHERE channel = 'notification' AND status = 'sent') AS notification_sent
            FROM notification_logs
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at < $2)
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_one(pool)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_well_formed_entries() {
        assert!(NewLogEntry::new(Channel::Sms, "09120000000", "hi")
            .validate()
            .is_ok());
        assert!(NewLogEntry::new(Channel::Email, "a@b.c", "hi")
            .validate()
            .is_ok());
        assert!(NewLogEntry::new(Channel::Telegram, "123456", "hi")
            .validate()
            .is_ok());
        assert!(NewLogEntry::new(Channel::Notification, "user-42", "hi")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_message() {
        let entry = NewLogEntry::new(Channel::Sms, "09120000000", "   ");
        assert!(matches!(
            entry.validate(),
            Err(courier_common::error::AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_shape_mismatch() {
        // An email address is not deliverable over SMS
        let entry = NewLogEntry::new(Channel::Sms, "a@b.c", "hi");
        assert!(entry.validate().is_err());

        // A phone number is not an email recipient
        let entry = NewLogEntry::new(Channel::Email, "09120000000", "hi");
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_validate_notification_requires_user_id() {
        let mut entry = NewLogEntry::new(Channel::Notification, "user-42", "hi");
        assert_eq!(entry.user_id.as_deref(), Some("user-42"));

        entry.user_id = None;
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_user_id_on_other_channels() {
        let mut entry = NewLogEntry::new(Channel::Sms, "09120000000", "hi");
        entry.user_id = Some("user-42".to_string());
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_like_escape() {
        assert_eq!(like_escape("100%_done\\"), "100\\%\\_done\\\\");
    }

    #[test]
    fn test_day_bounds() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let start = day_start(day);
        let end = day_end_exclusive(day);
        assert_eq!(start.to_rfc3339(), "2025-06-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-06-02T00:00:00+00:00");
    }

    #[test]
    fn test_filter_search_pattern_trims_and_wraps() {
        let filter = LogFilter {
            search: Some("  hello  ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.search_pattern().as_deref(), Some("%hello%"));

        let blank = LogFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.search_pattern(), None);
    }
}
