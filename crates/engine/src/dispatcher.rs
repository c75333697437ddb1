//! Dispatcher — executes one delivery attempt for a log entry.
//!
//! Loads the entry, resolves its channel sender through the registry,
//! invokes the send, and records the outcome with a conditional update.
//! There is no retry loop here: retries are always explicit (manual retry
//! or a rescheduled entry), never automatic.

use sqlx::PgPool;

use courier_channels::ChannelRegistry;
use courier_common::error::AppError;
use courier_common::types::{DeliveryStatus, NotificationLog};

use crate::store::LogStore;

/// Channel-agnostic dispatch of individual log entries.
pub struct Dispatcher {
    registry: ChannelRegistry,
}

impl Dispatcher {
    pub fn new(registry: ChannelRegistry) -> Self {
        Self { registry }
    }

    /// Attempt delivery for the given log entry and return the refreshed row.
    ///
    /// - Already `sent` → no-op (idempotent; guards against duplicate triggers).
    /// - No sender registered → entry marked failed with "unknown channel".
    /// - Sender success → `pending → sent`, `sent_at` set, error cleared.
    /// - Sender failure → `pending → failed`, provider detail recorded.
    ///
    /// A send failure is ordinary data, not an error: this method only
    /// errors on store access problems or an unknown id.
    pub async fn dispatch(&self, pool: &PgPool, id: i64) -> Result<NotificationLog, AppError> {
        let entry = LogStore::get(pool, id).await?;

        if entry.status == DeliveryStatus::Sent {
            tracing::debug!(log_id = id, "Entry already sent, skipping dispatch");
            return Ok(entry);
        }

        let Some(sender) = self.registry.resolve(entry.channel) else {
            tracing::warn!(log_id = id, channel = %entry.channel, "No sender registered");
            LogStore::mark_failed(pool, id, "unknown channel").await?;
            return LogStore::get(pool, id).await;
        };

        match sender.send(&entry.recipient, &entry.message).await {
            Ok(()) => {
                let won = LogStore::mark_sent(pool, id).await?;
                if won {
                    tracing::info!(log_id = id, channel = %entry.channel, "Notification sent");
                } else {
                    // Another trigger finished the transition first; its
                    // recorded outcome stands.
                    tracing::debug!(log_id = id, "Lost dispatch transition race");
                }
            }
            Err(err) => {
                tracing::warn!(
                    log_id = id,
                    channel = %entry.channel,
                    error = %err,
                    "Notification delivery failed"
                );
                LogStore::mark_failed(pool, id, &err.to_string()).await?;
            }
        }

        LogStore::get(pool, id).await
    }
}
