use axum::extract::State;
use axum::Json;
use serde_json::{json, Map, Value};
use stress_model::{StressLevel, FEATURE_NAMES, FEATURE_SPECS, MAX_BATCH_SIZE};

use super::health::{API_VERSION, SERVICE_NAME};
use super::MAX_BODY_BYTES;
use crate::state::AppState;

pub(crate) async fn index() -> Json<Value> {
    Json(json!({
        "application": "Stress Detection API",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "api_health": "/api/health",
            "predict": "/api/predict (POST)",
            "batch_predict": "/api/batch-predict (POST)",
            "features": "/api/features (GET)"
        },
        "documentation": "/docs"
    }))
}

pub(crate) async fn docs() -> Json<Value> {
    let request_fields: Map<String, Value> = FEATURE_NAMES
        .iter()
        .map(|name| (name.to_string(), Value::from("number")))
        .collect();

    Json(json!({
        "title": "Stress Detection API Documentation",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": API_VERSION,
        "description": "API for predicting stress levels using physiological data",
        "limits": {
            "max_batch_size": MAX_BATCH_SIZE,
            "max_body_bytes": MAX_BODY_BYTES
        },
        "endpoints": {
            "/health": {
                "method": "GET",
                "description": "Health check endpoint",
                "response": {
                    "status": "healthy",
                    "service": SERVICE_NAME,
                    "model_status": "loaded|mock"
                }
            },
            "/api/health": {
                "method": "GET",
                "description": "API health including which classifier is serving"
            },
            "/api/predict": {
                "method": "POST",
                "description": "Predict stress level for single input",
                "request": request_fields,
                "response": {
                    "stress_level": "low|medium|high",
                    "confidence": "number (0-1)",
                    "probabilities": {
                        "low": "number",
                        "medium": "number",
                        "high": "number"
                    },
                    "features_used": "array of feature names"
                }
            },
            "/api/batch-predict": {
                "method": "POST",
                "description": "Predict stress levels for multiple inputs",
                "request": {
                    "data": format!("array of 1-{MAX_BATCH_SIZE} prediction objects")
                },
                "response": {
                    "count": "number",
                    "failed": "number of items rejected by validation",
                    "predictions": "array of predictions or {index, error} markers"
                }
            },
            "/api/features": {
                "method": "GET",
                "description": "Get information about model features"
            }
        }
    }))
}

pub(crate) async fn features(State(state): State<AppState>) -> Json<Value> {
    let mut description = Map::new();
    let mut ranges = Map::new();
    for spec in &FEATURE_SPECS {
        description.insert(spec.name.to_string(), Value::from(spec.description));
        ranges.insert(
            spec.name.to_string(),
            json!({ "min": spec.min, "max": spec.max, "unit": spec.unit }),
        );
    }

    let stress_classes: Vec<&str> = StressLevel::ALL.iter().map(|level| level.as_str()).collect();

    Json(json!({
        "features": FEATURE_NAMES,
        "stress_classes": stress_classes,
        "description": description,
        "ranges": ranges,
        "model_status": state.predictor().status().as_str()
    }))
}
