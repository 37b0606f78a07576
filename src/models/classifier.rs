//! Classifier seam between the inference engine and model runtimes

use crate::error::InferenceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw model output for one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPrediction {
    /// Predicted class, 1 = churn
    pub label: u8,
    /// Probability of class 1
    pub probability: f64,
}

/// A loaded binary classifier. Implementations must be safe to share
/// read-only across request handlers.
pub trait Classifier: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &str;

    /// Column names in the order the model was fit on
    fn feature_names(&self) -> &[String];

    /// Score one record already in model column order
    fn predict(&self, features: &[f32]) -> Result<RawPrediction, InferenceError>;
}

impl fmt::Debug for dyn Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("name", &self.name())
            .field("features", &self.feature_names().len())
            .finish()
    }
}

/// Logistic scoring rule stored as JSON.
///
/// Used for lightweight deployments and as the fixture model in tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    #[serde(default = "default_name")]
    pub name: String,
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub intercept: f64,
    /// Decision threshold for the class label
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_name() -> String {
    "logistic".to_string()
}

fn default_threshold() -> f64 {
    0.5
}

impl LogisticClassifier {
    pub fn new(feature_names: Vec<String>, weights: Vec<f64>, intercept: f64) -> Self {
        Self {
            name: default_name(),
            feature_names,
            weights,
            intercept,
            threshold: default_threshold(),
        }
    }

    fn probability(&self, features: &[f32]) -> f64 {
        let margin: f64 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, &x)| w * x as f64)
            .sum::<f64>()
            + self.intercept;
        1.0 / (1.0 + (-margin).exp())
    }
}

impl Classifier for LogisticClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &[f32]) -> Result<RawPrediction, InferenceError> {
        if features.len() != self.weights.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.weights.len(),
                actual: features.len(),
            });
        }

        let probability = self.probability(features);
        let label = u8::from(probability >= self.threshold);
        Ok(RawPrediction { label, probability })
    }
}
