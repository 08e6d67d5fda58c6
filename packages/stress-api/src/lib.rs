pub mod config;
pub mod logging;
pub mod response;
pub mod routes;
pub mod state;

use stress_model::{LoadError, StressPredictor};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::AppState;

/// Loads the predictor described by `config` and builds the full router.
///
/// Fails only when the artifact is unusable and mock fallback is disabled.
pub fn create_app(config: &Config) -> Result<axum::Router, LoadError> {
    let predictor = StressPredictor::load(&config.predictor_config())?;
    Ok(build_app(AppState::new(predictor, config.clone())))
}

pub fn build_app(state: AppState) -> axum::Router {
    routes::router(state).layer(TraceLayer::new_for_http())
}
