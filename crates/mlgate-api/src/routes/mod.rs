use crate::AppState;
use axum::Router;

pub mod custom_inference;
pub mod health;
pub mod metrics;
pub mod predict;
pub mod setup;
pub mod webhook;

/// Merge all routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(custom_inference::routes())
        .merge(health::routes())
        .merge(metrics::routes())
        .merge(predict::routes())
        .merge(setup::routes())
        .merge(webhook::routes())
}
