mod health;
mod info;
mod predict;

use axum::body::Body;
use axum::extract::OriginalUri;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use http_body_util::LengthLimitError;
use serde_json::Value;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;
use crate::response::AppError;
use crate::state::AppState;

/// Largest request body accepted, in bytes
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/health", get(health::api_health).fallback(method_not_allowed))
        .route("/api/features", get(info::features).fallback(method_not_allowed))
        .route("/api/predict", post(predict::predict).fallback(method_not_allowed))
        .route(
            "/api/batch-predict",
            post(predict::batch_predict).fallback(method_not_allowed),
        )
        .layer(cors_layer(state.config()));

    Router::new()
        .route("/", get(info::index).fallback(method_not_allowed))
        .route("/docs", get(info::docs).fallback(method_not_allowed))
        .route("/health", get(health::health).fallback(method_not_allowed))
        .merge(api)
        .fallback(fallback_handler)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// Reads a JSON request body.
///
/// Rejects non-JSON content types, bodies over [`MAX_BODY_BYTES`] and
/// malformed JSON.
pub(crate) async fn read_json(req: Request<Body>) -> Result<Value, AppError> {
    let (parts, body) = req.into_parts();

    if !is_json_content_type(&parts.headers) {
        let received = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| Value::from(value.to_string()))
            .unwrap_or(Value::Null);
        return Err(
            AppError::bad_request("Content-Type must be application/json")
                .with_detail("received", received),
        );
    }

    let body_bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) if is_length_limit(&err) => {
            return Err(AppError::payload_too_large(format!(
                "Request body exceeds {MAX_BODY_BYTES} bytes"
            )));
        }
        Err(err) => {
            tracing::debug!(error = %err, "failed to read request body");
            return Err(AppError::bad_request("Failed to read request body"));
        }
    };

    serde_json::from_slice(&body_bytes).map_err(|err| {
        tracing::debug!(error = %err, "malformed JSON body");
        AppError::bad_request("Request body must be valid JSON")
    })
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if inner.is::<LengthLimitError>() {
            return true;
        }
        source = inner.source();
    }
    false
}

async fn fallback_handler(OriginalUri(uri): OriginalUri) -> Response {
    AppError::not_found("Endpoint not found")
        .with_detail("message", "Please check the API documentation at /docs")
        .with_detail("path", uri.path())
        .into_response()
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> Response {
    AppError::method_not_allowed("Method not allowed")
        .with_detail("path", uri.path())
        .with_detail("method", method.as_str())
        .into_response()
}
