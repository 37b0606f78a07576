//! Error taxonomy for the prediction pipeline.
//!
//! Each stage owns its error type; [`PipelineError`] is what the HTTP layer
//! turns into a status code.

use thiserror::Error;

/// A request field failed schema validation. Always a client fault.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid field `{field}`: {constraint}")]
pub struct ValidationError {
    /// Offending feature name (or `$` for the request body itself)
    pub field: String,
    /// Human readable constraint that was violated
    pub constraint: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}

/// Failure while scoring a canonical record.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// No model has been installed yet, or loading failed
    #[error("model not loaded")]
    ModelUnavailable,

    /// Record width does not match the model's column count
    #[error("expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The runtime rejected the input or produced unusable output
    #[error("model runtime error: {0}")]
    Runtime(String),
}

/// Audit log append failure. Never propagated to API callers.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit log lock poisoned")]
    Poisoned,
}

/// Error surfaced by [`crate::pipeline::PredictionService`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PipelineError {
    /// Short label used for metrics and the `/metrics` error breakdown.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::Inference(InferenceError::ModelUnavailable) => "model_unavailable",
            PipelineError::Inference(InferenceError::ShapeMismatch { .. }) => "shape_mismatch",
            PipelineError::Inference(InferenceError::Runtime(_)) => "inference",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("tenure", "must be <= 100");
        assert_eq!(err.to_string(), "invalid field `tenure`: must be <= 100");
    }

    #[test]
    fn test_pipeline_error_kind() {
        let err: PipelineError = ValidationError::new("tenure", "required").into();
        assert!(err.is_client_error());
        assert_eq!(err.kind(), "validation");

        let err: PipelineError = InferenceError::ShapeMismatch {
            expected: 30,
            actual: 29,
        }
        .into();
        assert!(!err.is_client_error());
        assert_eq!(err.kind(), "shape_mismatch");
    }
}
