//! Inference engine over the shared model handle

use crate::canonicalizer::CanonicalRecord;
use crate::error::InferenceError;
use crate::models::classifier::RawPrediction;
use crate::models::handle::ModelHandle;
use tracing::{debug, error};

/// Single and batch scoring of canonical records.
///
/// Holds no mutable state of its own; clones share the same model.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    handle: ModelHandle,
}

impl InferenceEngine {
    pub fn new(handle: ModelHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    pub fn is_ready(&self) -> bool {
        self.handle.is_loaded()
    }

    /// Score one record. Fails fast when no model is installed.
    pub fn predict_one(&self, record: &CanonicalRecord) -> Result<RawPrediction, InferenceError> {
        let model = self.handle.get().ok_or(InferenceError::ModelUnavailable)?;

        let expected = model.schema().len();
        if record.len() != expected {
            return Err(InferenceError::ShapeMismatch {
                expected,
                actual: record.len(),
            });
        }

        let prediction = model.classifier().predict(record.values()).map_err(|e| {
            error!(model = %model.classifier().name(), error = %e, "Model inference failed");
            e
        })?;

        if !(0.0..=1.0).contains(&prediction.probability) {
            error!(
                model = %model.classifier().name(),
                probability = prediction.probability,
                "Model returned an invalid probability"
            );
            return Err(InferenceError::Runtime(format!(
                "probability {} outside [0, 1]",
                prediction.probability
            )));
        }

        debug!(
            model = %model.classifier().name(),
            label = prediction.label,
            probability = prediction.probability,
            "Inference complete"
        );

        Ok(prediction)
    }

    /// Score every record independently. Output has one slot per input,
    /// in input order, whatever fails.
    pub fn predict_batch(
        &self,
        records: &[CanonicalRecord],
    ) -> Vec<Result<RawPrediction, InferenceError>> {
        records.iter().map(|r| self.predict_one(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classifier::{Classifier, LogisticClassifier};
    use crate::models::handle::ReadyModel;
    use std::sync::Arc;

    /// Rejects any record whose first column is negative
    struct PickyClassifier {
        names: Vec<String>,
    }

    impl Classifier for PickyClassifier {
        fn name(&self) -> &str {
            "picky"
        }

        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, features: &[f32]) -> Result<RawPrediction, InferenceError> {
            if features[0] < 0.0 {
                return Err(InferenceError::Runtime("negative input".to_string()));
            }
            Ok(RawPrediction {
                label: 0,
                probability: features[0] as f64 / 10.0,
            })
        }
    }

    fn engine_with(classifier: Arc<dyn Classifier>) -> InferenceEngine {
        InferenceEngine::new(ModelHandle::ready(ReadyModel::new(classifier, "memory").unwrap()))
    }

    fn logistic_engine() -> InferenceEngine {
        engine_with(Arc::new(LogisticClassifier::new(
            vec!["tenure".to_string(), "MonthlyCharges".to_string()],
            vec![-0.05, 0.03],
            0.2,
        )))
    }

    #[test]
    fn test_unloaded_model_fails_fast() {
        let engine = InferenceEngine::new(ModelHandle::unloaded());
        let record = CanonicalRecord::from_ordered(vec![1.0, 2.0]);
        assert!(matches!(
            engine.predict_one(&record),
            Err(InferenceError::ModelUnavailable)
        ));
    }

    #[test]
    fn test_column_count_mismatch() {
        let record = CanonicalRecord::from_ordered(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            logistic_engine().predict_one(&record),
            Err(InferenceError::ShapeMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_predict_one_is_idempotent() {
        let engine = logistic_engine();
        let record = CanonicalRecord::from_ordered(vec![12.0, 70.0]);
        let first = engine.predict_one(&record).unwrap();
        let second = engine.predict_one(&record).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_batch_preserves_order_and_cardinality() {
        let engine = engine_with(Arc::new(PickyClassifier {
            names: vec!["tenure".to_string()],
        }));
        let records = vec![
            CanonicalRecord::from_ordered(vec![1.0]),
            CanonicalRecord::from_ordered(vec![-1.0]),
            CanonicalRecord::from_ordered(vec![3.0, 4.0]),
            CanonicalRecord::from_ordered(vec![5.0]),
        ];

        let results = engine.predict_batch(&records);
        assert_eq!(results.len(), records.len());
        assert!((results[0].as_ref().unwrap().probability - 0.1).abs() < 1e-6);
        assert!(matches!(results[1], Err(InferenceError::Runtime(_))));
        assert!(matches!(results[2], Err(InferenceError::ShapeMismatch { .. })));
        assert!((results[3].as_ref().unwrap().probability - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_probability_is_an_error() {
        let engine = engine_with(Arc::new(PickyClassifier {
            names: vec!["tenure".to_string()],
        }));

        for bad in [20.0, f32::NAN] {
            let record = CanonicalRecord::from_ordered(vec![bad]);
            assert!(matches!(
                engine.predict_one(&record),
                Err(InferenceError::Runtime(_))
            ));
        }
    }

    #[test]
    fn test_empty_batch() {
        assert!(logistic_engine().predict_batch(&[]).is_empty());
    }
}
