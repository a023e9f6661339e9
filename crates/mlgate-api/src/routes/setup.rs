use crate::{AppState, error::ApiResult};
use axum::{Json, Router, extract::State, extract::rejection::JsonRejection, routing::post};
use mlgate::SetupRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetupResponse {
    /// Whatever the handler reports for `model_version`, `null` if unset
    #[schema(value_type = Option<Object>)]
    pub model_version: Option<Value>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/setup", post(setup))
}

/// Bind a handler to a project and report its model version
#[utoipa::path(
    post,
    path = "/setup",
    tag = "model",
    request_body = Object,
    responses(
        (status = 200, description = "Handler is ready", body = SetupResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or wrong credentials")
    )
)]
pub async fn setup(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<SetupResponse>> {
    let Json(body) = body?;
    let request = SetupRequest::from_value(body)?;
    tracing::info!(project = %request.project_id, "Setting up handler");

    let handler = state.factory.resolve(request.handler_spec()).await?;
    if let Some(extra_params) = request.extra_params {
        handler.set_extra_params(extra_params).await?;
    }
    let model_version = handler.get("model_version").await?;

    Ok(Json(SetupResponse { model_version }))
}
