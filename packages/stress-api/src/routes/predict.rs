use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use stress_model::{
    BatchOutcome, PredictError, PredictionResult, ValidationError, FEATURE_COUNT, FEATURE_NAMES,
};

use super::read_json;
use crate::response::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub(crate) struct PredictResponse {
    #[serde(flatten)]
    result: PredictionResult,
    features_used: [&'static str; FEATURE_COUNT],
}

#[derive(Serialize)]
pub(crate) struct BatchPredictResponse {
    count: usize,
    failed: usize,
    predictions: Vec<BatchOutcome>,
}

pub(crate) async fn predict(
    State(state): State<AppState>,
    req: Request<Body>,
) -> Result<Json<PredictResponse>, AppError> {
    let payload = read_json(req).await?;

    if let Value::Object(map) = &payload {
        tracing::debug!(keys = ?map.keys().collect::<Vec<_>>(), "prediction request received");
    }

    let result = state
        .predictor()
        .predict_value(&payload)
        .map_err(predict_error)?;

    tracing::info!(
        stress_level = %result.stress_level,
        confidence = result.confidence,
        "prediction completed"
    );

    Ok(Json(PredictResponse {
        result,
        features_used: FEATURE_NAMES,
    }))
}

pub(crate) async fn batch_predict(
    State(state): State<AppState>,
    req: Request<Body>,
) -> Result<Json<BatchPredictResponse>, AppError> {
    let payload = read_json(req).await?;

    let Some(items) = payload.get("data").and_then(Value::as_array) else {
        return Err(AppError::validation(
            "Request must contain \"data\" key with a list of predictions",
        ));
    };

    let predictions = state
        .predictor()
        .batch_predict(items)
        .map_err(|err| match err {
            PredictError::Validation(err) => AppError::validation(err.to_string()),
            PredictError::Inference(err) => {
                tracing::error!(error = %err, items = items.len(), "batch prediction failed");
                AppError::internal(err.to_string())
            }
        })?;

    let failed = predictions.iter().filter(|p| p.is_invalid()).count();
    tracing::info!(count = predictions.len(), failed, "batch prediction completed");

    Ok(Json(BatchPredictResponse {
        count: predictions.len(),
        failed,
        predictions,
    }))
}

/// Single-item failures echo the empty prediction fields clients expect.
fn predict_error(err: PredictError) -> AppError {
    match err {
        PredictError::Validation(err) => validation_error(&err)
            .with_detail("stress_level", Value::Null)
            .with_detail("confidence", 0.0),
        PredictError::Inference(err) => {
            tracing::error!(error = %err, "prediction failed");
            AppError::internal(err.to_string())
        }
    }
}

fn validation_error(err: &ValidationError) -> AppError {
    tracing::debug!(error = %err, "rejected prediction input");
    AppError::validation(err.to_string())
}
