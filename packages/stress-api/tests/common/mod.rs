#![allow(dead_code)]

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use serde_json::Value;

use stress_api::config::{Config, Environment};
use stress_model::train::{train_forest, Dataset, ForestParams};

pub fn test_config(model_path: impl Into<PathBuf>, allow_mock_model: bool) -> Config {
    Config {
        environment: Environment::Testing,
        model_path: model_path.into(),
        allow_mock_model,
        ..Config::default()
    }
}

/// App backed by the mock classifier: the artifact path never exists.
pub async fn create_test_app() -> Router {
    let config = test_config("/nonexistent/stress_model.json", true);
    stress_api::create_app(&config).expect("mock fallback is allowed")
}

/// Trains a small forest and writes it to `dir/stress_model.json`.
pub fn write_trained_model(dir: &Path) -> PathBuf {
    let data = Dataset::synthetic(300, 42);
    let params = ForestParams {
        n_estimators: 10,
        ..ForestParams::default()
    };
    let forest = train_forest(&data, &params).expect("training succeeds");
    let path = dir.join("stress_model.json");
    forest.save(&path).expect("artifact written");
    path
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
