use std::sync::Arc;
use std::time::Duration;

use courier_channels::ChannelRegistry;
use courier_common::config::AppConfig;
use courier_common::db;
use courier_engine::dispatcher::Dispatcher;
use courier_engine::scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_worker=info,courier_engine=info".into()),
        )
        .json()
        .init();

    tracing::info!("Courier worker starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Connect to database
    let pool = db::create_pool(&config).await?;

    // Run migrations
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    let registry = ChannelRegistry::from_config(&config);
    let dispatcher = Arc::new(Dispatcher::new(registry));
    let scheduler = Scheduler::new(dispatcher, config.scheduler_batch_size);

    tracing::info!("Starting scheduler loop");

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        result = scheduler.run(pool, Duration::from_secs(config.scheduler_tick_secs)) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Scheduler exited with error");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    tracing::info!("Courier worker stopped.");
    Ok(())
}
