//! In-app inbox over `notification` channel log rows.
//!
//! There is no separate inbox table: a sent or pending `notification` row
//! IS the inbox item for its owning user. Every query here is scoped to
//! `channel = 'notification'` and the owning `user_id`, so one user can
//! never read or mutate another user's items.

use sqlx::PgPool;

use courier_common::error::AppError;
use courier_common::types::{InboxFilter, NotificationLog};

/// Per-user inbox queries and read-state mutations.
pub struct InboxService;

impl InboxService {
    /// List a user's inbox items, newest first.
    pub async fn list(
        pool: &PgPool,
        user_id: &str,
        filter: InboxFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationLog>, AppError> {
        let is_read = match filter {
            InboxFilter::All => None,
            InboxFilter::Unread => Some(false),
            InboxFilter::Read => Some(true),
        };

        let items: Vec<NotificationLog> = sqlx::query_as(
            r#"
            SELECT * FROM notification_logs
            WHERE channel = 'notification'
              AND user_id = $1
              AND ($2::boolean IS NULL OR is_read = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(is_read)
        .bind(limit.max(0))
        .bind(offset.max(0))
        .fetch_all(pool)
        .await?;

        Ok(items)
    }

    /// Number of unread items, for the badge counter.
    pub async fn unread_count(pool: &PgPool, user_id: &str) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM notification_logs
            WHERE channel = 'notification' AND user_id = $1 AND is_read = false
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Mark one item read. Marking an already-read item is a no-op; an id
    /// that does not exist or belongs to another user is `NotFound`.
    pub async fn mark_read(
        pool: &PgPool,
        user_id: &str,
        id: i64,
    ) -> Result<NotificationLog, AppError> {
        let item: NotificationLog = sqlx::query_as(
            r#"
            UPDATE notification_logs
            SET is_read = true
            WHERE id = $1 AND channel = 'notification' AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Inbox item {} not found", id)))?;

        Ok(item)
    }

    /// Mark every unread item read in one sweep. Returns the number of
    /// items transitioned; calling it again immediately returns 0.
    pub async fn mark_all_read(pool: &PgPool, user_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notification_logs
            SET is_read = true
            WHERE channel = 'notification' AND user_id = $1 AND is_read = false
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete one item. Returns whether a row was removed; a foreign or
    /// unknown id removes nothing.
    pub async fn delete(pool: &PgPool, user_id: &str, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM notification_logs
            WHERE id = $1 AND channel = 'notification' AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bulk-delete every read item for the user. Unread items are kept.
    pub async fn delete_all_read(pool: &PgPool, user_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM notification_logs
            WHERE channel = 'notification' AND user_id = $1 AND is_read = true
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        tracing::info!(
            user_id,
            deleted = result.rows_affected(),
            "Read inbox items cleared"
        );

        Ok(result.rows_affected())
    }
}
