//! Delivery statistics over an inclusive calendar-day range.

use chrono::NaiveDate;
use sqlx::PgPool;

use courier_common::error::AppError;
use courier_common::types::NotificationStats;

use crate::store::{day_end_exclusive, day_start, LogStore};

/// Read-only aggregation over the notification log.
pub struct StatsAggregator;

impl StatsAggregator {
    /// Aggregate counts for entries created within the given day range.
    /// Bounds are inclusive whole days; either side may be open.
    pub async fn aggregate(
        pool: &PgPool,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<NotificationStats, AppError> {
        LogStore::stats(
            pool,
            date_from.map(day_start),
            date_to.map(day_end_exclusive),
        )
        .await
    }
}
