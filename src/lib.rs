//! Customer Churn Prediction Service
//!
//! Online inference for a boosted-tree churn model: request validation,
//! feature canonicalization, scoring, response shaping and an append-only
//! audit log feeding offline drift monitoring.

pub mod api;
pub mod audit;
pub mod canonicalizer;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod state;
pub mod types;
pub mod validator;

pub use audit::AuditLogger;
pub use canonicalizer::FeatureCanonicalizer;
pub use config::AppConfig;
pub use error::{InferenceError, PipelineError, ValidationError};
pub use models::inference::InferenceEngine;
pub use pipeline::PredictionService;
pub use schema::FeatureSchema;
pub use types::{InferenceRequest, PredictionOutcome};
pub use validator::RequestValidator;
