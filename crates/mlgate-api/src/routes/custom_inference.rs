use crate::{AppState, error::ApiError, error::ApiResult};
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use mlgate::{PredictRequest, normalize_predictions};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use subtle::ConstantTimeEq;
use utoipa::{IntoParams, ToSchema};

const SELF_TEST_LABEL_CONFIG: &str = r#"<View><Text name="text" value="$text"/><Choices name="label" toName="text"><Choice value="smoke"/></Choices></View>"#;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomInferenceQuery {
    /// Must match the configured inference secret
    pub secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomInferenceResponse {
    pub message: String,
    pub model_class: String,
    /// Normalized predictions for the built-in task
    #[schema(value_type = Object)]
    pub results: Value,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/custom_inference", get(custom_inference).post(custom_inference))
}

/// Fixed predict request used to check that the bound handler runs at all
fn self_test_payload() -> Value {
    json!({
        "tasks": [{
            "id": 1,
            "data": {"text": "mlgate self-test"},
            "annotations": [],
            "predictions": []
        }],
        "project": "1.1694809921",
        "label_config": SELF_TEST_LABEL_CONFIG,
        "params": {"login": null, "password": null, "context": null}
    })
}

fn secret_matches(expected: Option<&str>, given: Option<&str>) -> bool {
    match (expected, given) {
        (Some(expected), Some(given)) if !expected.is_empty() => {
            expected.as_bytes().ct_eq(given.as_bytes()).into()
        }
        _ => false,
    }
}

/// Run a built-in prediction through the bound handler
#[utoipa::path(
    method(get, post),
    path = "/custom_inference",
    tag = "model",
    params(CustomInferenceQuery),
    responses(
        (status = 200, description = "Handler answered the built-in task", body = CustomInferenceResponse),
        (status = 403, description = "Secret missing, wrong, or not configured")
    )
)]
pub async fn custom_inference(
    State(state): State<AppState>,
    Query(query): Query<CustomInferenceQuery>,
) -> ApiResult<Json<CustomInferenceResponse>> {
    let expected = state.config.auth.inference_secret.as_deref();
    if !secret_matches(expected, query.secret.as_deref()) {
        return Err(ApiError::Forbidden);
    }

    let request = PredictRequest::from_value(self_test_payload())?;
    let handler = state.factory.resolve(request.handler_spec()).await?;
    let output = handler
        .predict(request.tasks, request.context, request.params)
        .await?;
    let version = handler.model_version().await;
    let envelope = normalize_predictions(output, version.as_deref())?;
    tracing::info!(model_class = %state.factory.model_class(), "Self-test inference succeeded");

    Ok(Json(CustomInferenceResponse {
        message: "Hello from the other side".to_string(),
        model_class: state.factory.model_class().to_string(),
        results: envelope.results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_matches() {
        assert!(secret_matches(Some("swordfish"), Some("swordfish")));
        assert!(!secret_matches(Some("swordfish"), Some("swordfisH")));
        assert!(!secret_matches(Some("swordfish"), None));
        assert!(!secret_matches(None, None));
        assert!(!secret_matches(None, Some("")));
        assert!(!secret_matches(Some(""), Some("")));
    }

    #[test]
    fn test_self_test_payload_normalizes() {
        let request = PredictRequest::from_value(self_test_payload()).unwrap();
        assert_eq!(request.tasks.len(), 1);
        assert_eq!(request.project_id.unwrap().as_str(), "1");
        assert!(request.context.is_empty());
    }
}
