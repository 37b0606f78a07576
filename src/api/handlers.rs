use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info_span};
use uuid::Uuid;

use crate::error::{InferenceError, PipelineError};
use crate::metrics::MetricsSnapshot;
use crate::state::AppState;
use crate::types::outcome::{round_probability, ChurnLabel, Confidence, PredictionOutcome};
use crate::types::request::InferenceRequest;

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub churn_prediction: ChurnLabel,
    pub churn_probability: f64,
    pub confidence: Confidence,
    pub recommendation: String,
    pub timestamp: String,
}

impl From<PredictionOutcome> for PredictionResponse {
    fn from(outcome: PredictionOutcome) -> Self {
        Self {
            churn_prediction: outcome.label,
            churn_probability: round_probability(outcome.probability),
            confidence: outcome.confidence,
            recommendation: outcome.recommendation,
            timestamp: outcome.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Prediction {
        churn_prediction: ChurnLabel,
        churn_probability: f64,
    },
    Error {
        error: String,
    },
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub predictions: Vec<BatchItem>,
    pub count: usize,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            PipelineError::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "field": e.field,
                    "constraint": e.constraint,
                    "message": e.to_string(),
                }),
            ),
            PipelineError::Inference(InferenceError::ModelUnavailable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!("Model not loaded"),
            ),
            PipelineError::Inference(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!(format!("Prediction error: {}", e)),
            ),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Run blocking pipeline work off the async workers
async fn run_blocking<T, F>(work: F) -> Result<T, Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let span = info_span!("prediction", request_id = %Uuid::new_v4());
    tokio::task::spawn_blocking(move || span.in_scope(work))
        .await
        .map_err(|e| {
            error!(error = %e, "Prediction task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "Prediction task failed"})),
            )
                .into_response()
        })
}

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Customer Churn Prediction API",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.service.handle().is_loaded(),
    }))
}

/// Liveness. Readiness is reported only through `model`.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let loaded = state.service.handle().is_loaded();
    Json(json!({
        "status": "healthy",
        "model": if loaded { "loaded" } else { "not loaded" },
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    }))
}

pub async fn predict(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let request = match InferenceRequest::try_from(payload) {
        Ok(request) => request,
        Err(e) => return PipelineError::from(e).into_response(),
    };

    let service = state.service.clone();
    match run_blocking(move || service.predict(&request)).await {
        Ok(Ok(outcome)) => (StatusCode::OK, Json(PredictionResponse::from(outcome))).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(response) => response,
    }
}

pub async fn predict_batch(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let items = match payload {
        Value::Array(items) => items,
        _ => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"detail": "request body must be a JSON array"})),
            )
                .into_response()
        }
    };

    let service = state.service.clone();
    let results = match run_blocking(move || service.predict_batch(items)).await {
        Ok(Ok(results)) => results,
        Ok(Err(e)) => return e.into_response(),
        Err(response) => return response,
    };

    let predictions: Vec<BatchItem> = results
        .into_iter()
        .map(|result| match result {
            Ok(outcome) => BatchItem::Prediction {
                churn_prediction: outcome.label,
                churn_probability: round_probability(outcome.probability),
            },
            Err(e) => BatchItem::Error {
                error: e.to_string(),
            },
        })
        .collect();

    let count = predictions.len();
    (StatusCode::OK, Json(BatchResponse { predictions, count })).into_response()
}

pub async fn model_info(State(state): State<AppState>) -> Json<Value> {
    let info = &state.config.model_info;
    let model = state.service.handle().get();

    Json(json!({
        "model_type": info.model_type,
        "training_platform": info.training_platform,
        "features_count": model.map(|m| m.schema().len()),
        "accuracy": info.accuracy,
        "f1_score": info.f1_score,
        "training_cost": info.training_cost,
        "spot_savings": info.spot_savings,
        "model_loaded": model.is_some(),
        "model_source": model.map(|m| m.source().to_string()),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.service.metrics().snapshot())
}
