use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;

/// Open the connection pool backing the notification log store.
///
/// Sizing and acquire timeout come from [`AppConfig`]
/// (`DB_MAX_CONNECTIONS`, `DB_ACQUIRE_TIMEOUT_SECS`). Both the API server
/// and the scheduler worker share this constructor, so a deployment tunes
/// one set of knobs.
pub async fn create_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        acquire_timeout_secs = config.db_acquire_timeout_secs,
        "Notification store pool ready"
    );
    Ok(pool)
}
