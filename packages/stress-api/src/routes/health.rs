use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "stress-detection-api";
pub const API_VERSION: &str = "v1";

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    environment: &'static str,
    model_status: &'static str,
    uptime: u64,
    start_time: String,
    timestamp: String,
}

#[derive(Serialize)]
pub(crate) struct ApiHealthResponse {
    status: &'static str,
    message: &'static str,
    model_status: &'static str,
    classifier: &'static str,
    api_version: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config().environment.as_str(),
        model_status: state.predictor().status().as_str(),
        uptime: state.uptime_seconds(),
        start_time: system_time_iso(state.started_at_system()),
        timestamp: now_iso(),
    })
}

pub(crate) async fn api_health(State(state): State<AppState>) -> Json<ApiHealthResponse> {
    let predictor = state.predictor();
    Json(ApiHealthResponse {
        status: "ok",
        message: "Stress Detection API is running",
        model_status: predictor.status().as_str(),
        classifier: predictor.classifier_name(),
        api_version: API_VERSION,
    })
}

fn system_time_iso(time: std::time::SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Utc> = time.into();
    datetime.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
