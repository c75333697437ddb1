//! Bulk fan-out coordinator.
//!
//! Resolves the audience, creates one pending log row per
//! (channel, recipient) pair, then dispatches the batch with bounded
//! concurrency. Rows are created before any dispatch so an interruption
//! mid-fan-out leaves a consistent, resumable set of pending entries.
//! Partial failure is the expected outcome of a bulk send: individual
//! failures land in the log, the bulk call itself succeeds.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use sqlx::PgPool;

use courier_common::error::AppError;
use courier_common::types::{Audience, Channel, DeliveryStatus, NotificationLog};

use crate::dispatcher::Dispatcher;
use crate::resolver::RecipientResolver;
use crate::store::{LogStore, NewLogEntry};

/// Outcome of a bulk submission.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    /// Ids of all created log entries.
    pub created: Vec<i64>,
    /// Entries that ended the initial dispatch round as `sent`.
    pub dispatched: usize,
    /// Entries that ended it as `failed` (visible in the log with their
    /// provider detail, retryable individually). Entries left `pending` by
    /// a store-level error are in neither count; they remain dispatchable.
    pub failed: usize,
}

/// Combines resolver output with the requested channels and feeds the
/// dispatcher.
pub struct FanoutCoordinator {
    resolver: RecipientResolver,
    dispatcher: Arc<Dispatcher>,
    concurrency: usize,
}

impl FanoutCoordinator {
    pub fn new(
        resolver: RecipientResolver,
        dispatcher: Arc<Dispatcher>,
        concurrency: usize,
    ) -> Self {
        Self {
            resolver,
            dispatcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Submit one message to every resolved recipient on every requested
    /// channel. An empty audience creates zero messages and succeeds.
    pub async fn submit_bulk(
        &self,
        pool: &PgPool,
        channels: &[Channel],
        audience: &Audience,
        message: &str,
    ) -> Result<BulkOutcome, AppError> {
        if channels.is_empty() {
            return Err(AppError::Validation(
                "At least one channel is required".to_string(),
            ));
        }
        if message.trim().is_empty() {
            return Err(AppError::Validation("Message must not be empty".to_string()));
        }

        let resolved = self.resolver.resolve(audience, channels).await?;

        let mut entries = Vec::new();
        for channel in channels {
            if let Some(addresses) = resolved.get(channel) {
                for address in addresses {
                    entries.push(NewLogEntry::from_address(*channel, address, message));
                }
            }
        }

        let created = LogStore::create_batch(pool, &entries).await?;
        tracing::info!(
            channels = channels.len(),
            recipients = created.len(),
            "Bulk fan-out submitted"
        );

        let results: Vec<_> = futures::stream::iter(created.iter().copied())
            .map(|id| self.dispatcher.dispatch(pool, id))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let (dispatched, failed) = tally(results);

        tracing::info!(
            created = created.len(),
            dispatched,
            failed,
            "Bulk fan-out finished"
        );

        Ok(BulkOutcome {
            created,
            dispatched,
            failed,
        })
    }
}

/// Summarize one dispatch round by the status each row ended with. A
/// store-level error leaves its row pending; it is logged but counted as
/// neither delivered nor failed.
fn tally(results: Vec<Result<NotificationLog, AppError>>) -> (usize, usize) {
    let mut dispatched = 0usize;
    let mut failed = 0usize;
    for result in results {
        match result {
            Ok(entry) if entry.status == DeliveryStatus::Sent => dispatched += 1,
            Ok(entry) if entry.status == DeliveryStatus::Failed => failed += 1,
            Ok(_) => {}
            Err(err) => {
                tracing::error!(error = %err, "Dispatch errored during fan-out");
            }
        }
    }
    (dispatched, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(status: DeliveryStatus) -> NotificationLog {
        NotificationLog {
            id: 1,
            channel: Channel::Sms,
            recipient: "09120000000".to_string(),
            message: "hi".to_string(),
            status,
            created_at: Utc::now(),
            scheduled_at: None,
            claimed_at: None,
            sent_at: (status == DeliveryStatus::Sent).then(Utc::now),
            error_message: (status == DeliveryStatus::Failed).then(|| "timeout".to_string()),
            user_id: None,
            is_read: false,
            title: None,
            link: None,
        }
    }

    #[test]
    fn test_tally_counts_only_settled_rows() {
        let results = vec![
            Ok(entry(DeliveryStatus::Sent)),
            Ok(entry(DeliveryStatus::Failed)),
            // Still pending after a lost transition race
            Ok(entry(DeliveryStatus::Pending)),
            Err(AppError::Internal("pool gone".to_string())),
        ];

        assert_eq!(tally(results), (1, 1));
    }
}
