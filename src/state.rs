use crate::config::AppConfig;
use crate::pipeline::PredictionService;
use std::sync::Arc;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(service: PredictionService, config: AppConfig) -> Self {
        Self {
            service: Arc::new(service),
            config: Arc::new(config),
        }
    }
}
