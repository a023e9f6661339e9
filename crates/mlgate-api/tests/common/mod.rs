#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use mlgate::{
    FnFactory, HandlerError, HandlerResult, HandlerSpec, ModelHandler, ModelResponse, Params,
    PredictOutput, Prediction, PredictionValue, ProjectId, SharedFactory, Task, TrainEvent,
};
use mlgate_api::{ApiConfig, AppState, AuthConfig, build_app};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

/// Everything the scripted handlers observed, shared across requests
#[derive(Default)]
pub struct Recorder {
    pub constructed: Mutex<Vec<HandlerSpec>>,
    pub fits: Mutex<Vec<(TrainEvent, Value)>>,
    pub extra_params: Mutex<Vec<Params>>,
}

impl Recorder {
    pub fn constructed_projects(&self) -> Vec<Option<ProjectId>> {
        self.constructed
            .lock()
            .unwrap()
            .iter()
            .map(|spec| spec.project_id.clone())
            .collect()
    }

    pub fn fit_count(&self) -> usize {
        self.fits.lock().unwrap().len()
    }
}

/// Handler whose behavior is chosen by the `mode` param of each request
pub struct ScriptedModel {
    spec: HandlerSpec,
    recorder: Arc<Recorder>,
}

fn prediction(version: Option<&str>) -> Prediction {
    Prediction::Single(PredictionValue {
        model_version: version.map(str::to_string),
        score: Some(0.9),
        result: vec![json!({"type": "choices", "value": {"choices": ["cat"]}})],
        extra: Default::default(),
    })
}

#[async_trait]
impl ModelHandler for ScriptedModel {
    async fn predict(
        &self,
        tasks: Vec<Task>,
        context: Params,
        params: Params,
    ) -> HandlerResult<PredictOutput> {
        let mode = params.get("mode").and_then(Value::as_str).unwrap_or("echo");
        match mode {
            "null" => Ok(PredictOutput::Raw(Value::Null)),
            "mapping" => Ok(PredictOutput::Raw(json!({"foo": "bar"}))),
            "envelope" => {
                let predictions = tasks.iter().map(|_| prediction(None)).collect();
                Ok(ModelResponse::new(predictions).into())
            }
            "explicit" => {
                let mut response =
                    ModelResponse::new(vec![prediction(None), prediction(Some("own"))]);
                response.model_version = Some("explicit".to_string());
                Ok(response.into())
            }
            "context" => Ok(PredictOutput::Raw(json!([{"context": context}]))),
            "not_found" => Err(HandlerError::not_found("no trained model")),
            "invariant" => Err(HandlerError::Invariant("label config mismatch".to_string())),
            "index" => Err(HandlerError::Index("task index out of range".to_string())),
            "fail" => Err(HandlerError::failed("inference crashed")),
            _ => Ok(PredictOutput::Raw(Value::Array(tasks))),
        }
    }

    async fn fit(&self, event: TrainEvent, payload: Value) -> HandlerResult<Value> {
        self.recorder
            .fits
            .lock()
            .unwrap()
            .push((event, payload.clone()));
        match event {
            TrainEvent::StartTraining => Err(HandlerError::failed("training exploded")),
            _ => Ok(json!({
                "event": event.to_string(),
                "project": self.spec.project_id.as_ref().map(ProjectId::as_str),
            })),
        }
    }

    async fn set_extra_params(&self, params: Params) -> HandlerResult<()> {
        self.recorder.extra_params.lock().unwrap().push(params);
        Ok(())
    }

    async fn model_version(&self) -> Option<String> {
        Some("v1".to_string())
    }
}

pub fn scripted_factory(recorder: Arc<Recorder>) -> SharedFactory {
    Arc::new(FnFactory::new(
        move |spec: HandlerSpec| -> HandlerResult<ScriptedModel> {
            recorder.constructed.lock().unwrap().push(spec.clone());
            Ok(ScriptedModel {
                spec,
                recorder: recorder.clone(),
            })
        },
    ))
}

/// Create a test application around the scripted handler
pub fn create_test_app(auth: AuthConfig) -> (axum::Router, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let config = ApiConfig {
        auth,
        ..ApiConfig::default()
    };
    let state = AppState::new(scripted_factory(recorder.clone()), config);
    (build_app(state), recorder)
}

pub fn basic_auth(username: &str, password: &str) -> String {
    use axum_extra::headers::{Authorization, Header};

    let credentials = Authorization::basic(username, password);
    let mut values = Vec::new();
    credentials.encode(&mut values);
    values[0].to_str().unwrap().to_string()
}

/// Helper function to make JSON requests
pub async fn json_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    authorization: Option<&str>,
) -> (StatusCode, Value) {
    let mut request_builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(authorization) = authorization {
        request_builder = request_builder.header(header::AUTHORIZATION, authorization);
    }

    let request = if let Some(body) = body {
        request_builder
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    } else {
        request_builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_value: Value = if body_bytes.is_empty() {
        json!(null)
    } else {
        match serde_json::from_slice(&body_bytes) {
            Ok(json) => json,
            Err(_) => {
                // Plain-text bodies come back as a JSON string
                let text = String::from_utf8_lossy(&body_bytes);
                json!(text.to_string())
            }
        }
    };

    (status, body_value)
}
