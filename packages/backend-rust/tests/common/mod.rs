#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use ebbinghaus_backend::config::Config;
use ebbinghaus_backend::db::LearningUnitStore;
use ebbinghaus_backend::state::AppState;

pub fn create_test_app() -> Router {
    create_test_app_with(Config::default())
}

pub fn create_test_app_with(config: Config) -> Router {
    ebbinghaus_backend::build_router(AppState::new(LearningUnitStore::memory(), config))
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Create a plan and return its id
pub async fn create_plan(app: &Router, body: Value) -> String {
    let (status, json) = send(app, "POST", "/api/ebbinghaus/plans", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["data"]["id"].as_str().unwrap().to_string()
}

pub fn find_cell<'a>(schedule: &'a Value, day: u64, column: u64) -> Option<&'a Value> {
    schedule["rows"]
        .as_array()?
        .iter()
        .find(|row| row["day"] == day)?["cells"]
        .as_array()?
        .iter()
        .find(|cell| cell["column"] == column)
}
