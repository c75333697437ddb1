//! Shared application state for the Axum API server.

use std::sync::Arc;

use sqlx::PgPool;

use courier_channels::ChannelRegistry;
use courier_common::config::AppConfig;
use courier_engine::dispatcher::Dispatcher;
use courier_engine::fanout::FanoutCoordinator;
use courier_engine::resolver::{PgUserDirectory, RecipientResolver};

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub dispatcher: Arc<Dispatcher>,
    pub fanout: Arc<FanoutCoordinator>,
}

impl AppState {
    /// Build state with the channel registry derived from config.
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        let registry = ChannelRegistry::from_config(&config);
        Self::with_registry(pool, config, registry)
    }

    /// Build state with an explicit registry (tests inject mock senders here).
    pub fn with_registry(pool: PgPool, config: AppConfig, registry: ChannelRegistry) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(registry));
        let resolver = RecipientResolver::new(Arc::new(PgUserDirectory::new(pool.clone())));
        let fanout = Arc::new(FanoutCoordinator::new(
            resolver,
            dispatcher.clone(),
            config.dispatch_concurrency,
        ));

        Self {
            pool,
            config,
            dispatcher,
            fanout,
        }
    }
}
