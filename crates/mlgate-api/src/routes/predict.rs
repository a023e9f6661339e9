use crate::{AppState, error::ApiResult};
use axum::{Json, Router, extract::State, extract::rejection::JsonRejection, routing::post};
use mlgate::{PredictRequest, PredictionEnvelope, normalize_predictions};
use serde_json::Value;

pub fn routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}

/// Run the project's handler on a batch of tasks
#[utoipa::path(
    post,
    path = "/predict",
    tag = "model",
    request_body = Object,
    responses(
        (status = 200, description = "Predictions wrapped in `results`", body = Object),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or wrong credentials")
    )
)]
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<PredictionEnvelope>> {
    let Json(body) = body?;
    let request = PredictRequest::from_value(body)?;
    tracing::debug!(
        tasks = request.tasks.len(),
        project = ?request.project_id,
        "Predict request"
    );

    let handler = state.factory.resolve(request.handler_spec()).await?;
    let output = handler
        .predict(request.tasks, request.context, request.params)
        .await?;
    let version = handler.model_version().await;

    Ok(Json(normalize_predictions(output, version.as_deref())?))
}
