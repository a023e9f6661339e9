use crate::{AppState, error::ApiResult};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use mlgate::{HandlerResult, WebhookRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Webhook acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    /// `ok`, `error`, or `Unknown event`
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub result: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookResponse {
    fn unknown_event() -> Self {
        Self {
            status: "Unknown event".to_string(),
            result: None,
            error: None,
        }
    }

    fn from_fit(outcome: HandlerResult<Value>) -> Self {
        match outcome {
            Ok(result) => Self {
                status: "ok".to_string(),
                result: Some(result),
                error: None,
            },
            Err(e) => Self {
                status: "error".to_string(),
                result: None,
                error: Some(e.to_string()),
            },
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook))
}

/// Forward training events to the project's handler
///
/// Training failures are acknowledged with 201 so the platform does not
/// retry the delivery; the message is in `error`.
#[utoipa::path(
    post,
    path = "/webhook",
    tag = "model",
    request_body = Object,
    responses(
        (status = 200, description = "Event is not a training event", body = WebhookResponse),
        (status = 201, description = "Event processed", body = WebhookResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or wrong credentials")
    )
)]
pub async fn webhook(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<WebhookResponse>)> {
    let Json(body) = body?;

    let (event, spec, payload) = match WebhookRequest::from_value(body)? {
        WebhookRequest::Ignored { action } => {
            tracing::info!(?action, "Skipping webhook event");
            return Ok((StatusCode::OK, Json(WebhookResponse::unknown_event())));
        }
        WebhookRequest::Train {
            event,
            spec,
            payload,
        } => (event, spec, payload),
    };

    tracing::info!(%event, project = ?spec.project_id, "Training event");
    let outcome = match state.factory.resolve(spec).await {
        Ok(handler) => handler.fit(event, payload).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &outcome {
        tracing::error!(%event, "Training failed: {}", e);
    }

    Ok((StatusCode::CREATED, Json(WebhookResponse::from_fit(outcome))))
}
