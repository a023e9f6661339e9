mod common;

use axum::http::StatusCode;
use common::{create_test_app, json_request};
use mlgate::ProjectId;
use mlgate_api::AuthConfig;
use serde_json::json;

#[tokio::test]
async fn test_setup_reports_model_version() {
    let (app, recorder) = create_test_app(AuthConfig::default());

    let (status, body) = json_request(
        &app,
        "POST",
        "/setup",
        Some(json!({"project": "7.999", "schema": "<View/>"})),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"model_version": "v1"}));

    let constructed = recorder.constructed.lock().unwrap();
    assert_eq!(constructed[0].project_id, Some(ProjectId::from_string("7")));
    assert_eq!(constructed[0].label_config.as_deref(), Some("<View/>"));
}

#[tokio::test]
async fn test_setup_applies_extra_params() {
    let (app, recorder) = create_test_app(AuthConfig::default());

    let (status, _) = json_request(
        &app,
        "POST",
        "/setup",
        Some(json!({"project": "7", "extra_params": {"threshold": 0.5}})),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let applied = recorder.extra_params.lock().unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0]["threshold"], 0.5);
}

#[tokio::test]
async fn test_setup_skips_empty_extra_params() {
    let (app, recorder) = create_test_app(AuthConfig::default());

    json_request(
        &app,
        "POST",
        "/setup",
        Some(json!({"project": "7", "extra_params": {}})),
        None,
    )
    .await;

    assert!(recorder.extra_params.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_setup_without_project_is_bad_request() {
    let (app, recorder) = create_test_app(AuthConfig::default());

    let (status, body) =
        json_request(&app, "POST", "/setup", Some(json!({"schema": "<View/>"})), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "ERROR");
    assert!(recorder.constructed_projects().is_empty());
}
