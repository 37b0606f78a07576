//! Model artifact loader

use crate::models::classifier::{Classifier, LogisticClassifier};
use crate::models::handle::ReadyModel;
use crate::models::onnx::OnnxClassifier;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Sidecar metadata written next to ONNX exports at training time
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureMetadata {
    pub feature_names: Vec<String>,
}

impl FeatureMetadata {
    /// `models/model.onnx` -> `models/model.features.json`
    pub fn sidecar_path(model_path: &Path) -> PathBuf {
        model_path.with_extension("features.json")
    }

    pub fn load(model_path: &Path) -> Result<Self> {
        let path = Self::sidecar_path(model_path);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read feature metadata {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse feature metadata {}", path.display()))
    }
}

/// Loads the first usable model from a prioritized candidate list
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a single classifier, dispatching on file extension
    pub fn load_classifier(&self, path: &Path) -> Result<Arc<dyn Classifier>> {
        info!(path = %path.display(), "Loading model");

        match path.extension().and_then(|e| e.to_str()) {
            Some("onnx") => {
                let metadata = FeatureMetadata::load(path)?;
                let classifier =
                    OnnxClassifier::load(path, metadata.feature_names, self.onnx_threads)?;
                Ok(Arc::new(classifier))
            }
            Some("json") => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read model {}", path.display()))?;
                let classifier: LogisticClassifier = serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse model {}", path.display()))?;
                if classifier.weights.len() != classifier.feature_names.len() {
                    anyhow::bail!(
                        "Model {} has {} weights for {} features",
                        path.display(),
                        classifier.weights.len(),
                        classifier.feature_names.len()
                    );
                }
                Ok(Arc::new(classifier))
            }
            _ => anyhow::bail!("Unsupported model format: {}", path.display()),
        }
    }

    /// Load a classifier and derive its feature schema
    pub fn load_model(&self, path: &Path) -> Result<ReadyModel> {
        let classifier = self.load_classifier(path)?;
        let model = ReadyModel::new(classifier, path.display().to_string())
            .with_context(|| format!("Cannot derive feature schema for {}", path.display()))?;

        info!(
            model = %model.classifier().name(),
            path = %path.display(),
            features = model.schema().len(),
            "Model loaded successfully"
        );
        Ok(model)
    }

    /// Load the first existing candidate that loads cleanly
    pub fn load_first<P: AsRef<Path>>(&self, candidates: &[P]) -> Result<ReadyModel> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if !path.exists() {
                warn!(path = %path.display(), "Model file not found");
                continue;
            }

            match self.load_model(path) {
                Ok(model) => return Ok(model),
                Err(e) => {
                    warn!(path = %path.display(), error = %format!("{:#}", e), "Failed to load model, trying next candidate");
                }
            }
        }

        anyhow::bail!("No model could be loaded from {} candidate paths", candidates.len())
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
