pub mod handlers;

use crate::api::handlers::{health, metrics, model_info, predict, predict_batch, root};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/predict/batch", post(predict_batch))
        .route("/model/info", get(model_info))
        .route("/metrics", get(metrics))
}

/// Full application with tracing middleware and state attached
pub fn app(state: AppState) -> Router {
    routes().layer(TraceLayer::new_for_http()).with_state(state)
}
