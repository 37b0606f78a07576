//! ONNX Runtime backed classifier

use crate::error::InferenceError;
use crate::models::classifier::{Classifier, RawPrediction};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Boosted-tree classifier exported to ONNX.
pub struct OnnxClassifier {
    name: String,
    /// `Session::run` needs exclusive access; the model itself is never mutated
    session: Mutex<Session>,
    input_name: String,
    label_output: String,
    probability_output: String,
    feature_names: Vec<String>,
}

impl OnnxClassifier {
    /// Load a model file. Feature names come from the sidecar metadata.
    pub fn load(path: &Path, feature_names: Vec<String>, onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load ONNX model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone())
            .context("ONNX model has no label output")?;

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.iter().find(|o| o.name != label_output))
            .map(|o| o.name.clone())
            .context("ONNX model has no probability output")?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        info!(
            model = %name,
            input = %input_name,
            label = %label_output,
            probabilities = %probability_output,
            threads = onnx_threads,
            "ONNX session ready"
        );

        Ok(Self {
            name,
            session: Mutex::new(session),
            input_name,
            label_output,
            probability_output,
            feature_names,
        })
    }

    fn extract_label(&self, outputs: &SessionOutputs) -> Result<u8, InferenceError> {
        let output = outputs
            .get(self.label_output.as_str())
            .ok_or_else(|| runtime_error("label output missing"))?;

        let (_, data) = output
            .try_extract_tensor::<i64>()
            .map_err(|e| runtime_error(format!("label is not an int64 tensor: {}", e)))?;

        match data.first() {
            Some(&label) => Ok(u8::from(label == 1)),
            None => Err(runtime_error("empty label tensor")),
        }
    }

    /// Probability of class 1. Tensor outputs are `[batch, classes]`;
    /// some converters emit `seq(map(int64, float))` instead.
    fn extract_probability(&self, outputs: &SessionOutputs) -> Result<f64, InferenceError> {
        let output = outputs
            .get(self.probability_output.as_str())
            .ok_or_else(|| runtime_error("probability output missing"))?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let classes = dims.last().copied().unwrap_or(0);
            return match (classes, data) {
                (c, d) if c >= 2 && d.len() >= 2 => Ok(d[1] as f64),
                (1, [p, ..]) => Ok(*p as f64),
                _ => Err(runtime_error(format!(
                    "unexpected probability shape {:?}",
                    dims
                ))),
            };
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return extract_from_sequence_map(output);
        }

        Err(runtime_error("unsupported probability output type"))
    }
}

fn extract_from_sequence_map(output: &DynValue) -> Result<f64, InferenceError> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| runtime_error(format!("Failed to downcast to sequence: {}", e)))?;

    let maps = sequence
        .try_extract_sequence::<DynMapValueType>(&allocator)
        .map_err(|e| runtime_error(e.to_string()))?;

    // Batch size is always 1
    let map_value = maps.first().ok_or_else(|| runtime_error("Empty sequence"))?;
    let kv_pairs = map_value
        .try_extract_key_values::<i64, f32>()
        .map_err(|e| runtime_error(e.to_string()))?;

    if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
        return Ok(*prob as f64);
    }
    if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 0) {
        return Ok(1.0 - *prob as f64);
    }

    Err(runtime_error("No probability found in map"))
}

fn runtime_error(message: impl Into<String>) -> InferenceError {
    InferenceError::Runtime(message.into())
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &[f32]) -> Result<RawPrediction, InferenceError> {
        if features.len() != self.feature_names.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.feature_names.len(),
                actual: features.len(),
            });
        }

        // Input tensor shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .map_err(|e| runtime_error(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| runtime_error("session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| runtime_error(e.to_string()))?;

        let label = self.extract_label(&outputs)?;
        let probability = self.extract_probability(&outputs)?;

        debug!(model = %self.name, label = label, probability = probability, "ONNX inference complete");

        Ok(RawPrediction { label, probability })
    }
}
