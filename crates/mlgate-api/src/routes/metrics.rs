use crate::AppState;
use axum::{Json, Router, routing::get};
use serde_json::{Map, Value};

pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics))
}

/// Placeholder metrics endpoint; always an empty object
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "health",
    responses(
        (status = 200, description = "Empty metrics object", body = Object)
    )
)]
pub async fn metrics() -> Json<Value> {
    Json(Value::Object(Map::new()))
}
