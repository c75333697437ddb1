//! Scheduler — claims due scheduled entries and hands them to the
//! dispatcher on a fixed tick.
//!
//! A scheduled entry is an ordinary `pending` row with `scheduled_at` set;
//! there is no separate "scheduled" status. The claim is a single
//! conditional update (see [`LogStore::claim_due`]), so two scheduler
//! instances ticking concurrently dispatch each entry at most once; losing
//! the claim race is a silent skip, not an error.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use crate::dispatcher::Dispatcher;
use crate::store::LogStore;

/// Periodic dispatcher of due scheduled entries.
pub struct Scheduler {
    dispatcher: Arc<Dispatcher>,
    batch_size: i64,
}

impl Scheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, batch_size: i64) -> Self {
        Self {
            dispatcher,
            batch_size: batch_size.max(1),
        }
    }

    /// Run one tick: claim due entries and dispatch them.
    ///
    /// Dispatch failures are recorded by the dispatcher's own transition
    /// rules and never halt the tick. Returns the number of claimed
    /// entries.
    pub async fn tick(&self, pool: &PgPool) -> anyhow::Result<usize> {
        let due = LogStore::claim_due(pool, Utc::now(), self.batch_size).await?;

        if due.is_empty() {
            return Ok(0);
        }

        tracing::info!(count = due.len(), "Claimed due scheduled notifications");

        for entry in &due {
            if let Err(err) = self.dispatcher.dispatch(pool, entry.id).await {
                tracing::error!(
                    log_id = entry.id,
                    error = %err,
                    "Dispatch errored for scheduled entry"
                );
            }
        }

        Ok(due.len())
    }

    /// Run the tick loop indefinitely. A failed tick is logged and the
    /// loop continues; the caller decides when to stop (task cancellation
    /// or process shutdown).
    pub async fn run(&self, pool: PgPool, tick_interval: Duration) -> anyhow::Result<()> {
        tracing::info!(
            tick_secs = tick_interval.as_secs(),
            batch_size = self.batch_size,
            "Scheduler started"
        );

        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.tick(&pool).await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "Scheduler tick processed entries"),
                Err(err) => tracing::error!(error = %err, "Scheduler tick failed"),
            }
        }
    }
}
