//! Type definitions for the churn prediction pipeline

pub mod outcome;
pub mod request;

pub use outcome::{classify, ChurnLabel, Confidence, PredictionOutcome};
pub use request::InferenceRequest;
