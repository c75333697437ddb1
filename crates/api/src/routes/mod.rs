pub mod health;
pub mod inbox;
pub mod logs;
pub mod send;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(logs::router())
        .merge(send::router())
        .merge(inbox::router())
        .with_state(state)
}
