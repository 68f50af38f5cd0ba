//! HTTP route definitions.

mod batches;
mod health;
mod local;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(local::routes())
        .merge(batches::routes())
}
