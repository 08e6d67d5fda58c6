use std::sync::Arc;
use std::time::{Instant, SystemTime};

use stress_model::StressPredictor;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    predictor: Arc<StressPredictor>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(predictor: StressPredictor, config: Config) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            predictor: Arc::new(predictor),
            config: Arc::new(config),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn predictor(&self) -> Arc<StressPredictor> {
        Arc::clone(&self.predictor)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
