//! Shared read-only handle to the active model.
//!
//! The handle starts empty and is filled exactly once after a successful
//! load. Request handlers hold a clone from construction time and check
//! readiness per request instead of blocking on the load.

use crate::models::classifier::Classifier;
use crate::schema::{FeatureSchema, SchemaError};
use std::sync::{Arc, OnceLock};

/// A loaded classifier together with the schema derived from it.
#[derive(Debug, Clone)]
pub struct ReadyModel {
    classifier: Arc<dyn Classifier>,
    schema: Arc<FeatureSchema>,
    source: String,
}

impl ReadyModel {
    /// Derive the schema from the classifier's feature names.
    pub fn new(classifier: Arc<dyn Classifier>, source: impl Into<String>) -> Result<Self, SchemaError> {
        let schema = FeatureSchema::from_feature_names(classifier.feature_names())?;
        Ok(Self {
            classifier,
            schema: Arc::new(schema),
            source: source.into(),
        })
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    /// Where the model was loaded from
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Model is already installed; hot-swapping requires a restart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a model is already loaded")]
pub struct AlreadyLoaded;

/// Cloneable handle distinguishing "not ready" from "ready".
#[derive(Debug, Clone, Default)]
pub struct ModelHandle {
    slot: Arc<OnceLock<ReadyModel>>,
}

impl ModelHandle {
    /// Handle in the not-ready state
    pub fn unloaded() -> Self {
        Self::default()
    }

    /// Handle that is ready from the start
    pub fn ready(model: ReadyModel) -> Self {
        let handle = Self::default();
        // A fresh slot is always empty
        let _ = handle.slot.set(model);
        handle
    }

    /// Install the model. Visible to every clone of this handle.
    pub fn install(&self, model: ReadyModel) -> Result<(), AlreadyLoaded> {
        self.slot.set(model).map_err(|_| AlreadyLoaded)
    }

    pub fn get(&self) -> Option<&ReadyModel> {
        self.slot.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classifier::LogisticClassifier;

    fn model(features: &[&str]) -> ReadyModel {
        let classifier = LogisticClassifier::new(
            features.iter().map(|s| s.to_string()).collect(),
            vec![0.0; features.len()],
            0.0,
        );
        ReadyModel::new(Arc::new(classifier), "memory").unwrap()
    }

    #[test]
    fn test_install_visible_to_clones() {
        let handle = ModelHandle::unloaded();
        let clone = handle.clone();
        assert!(!clone.is_loaded());

        handle.install(model(&["tenure"])).unwrap();
        assert!(clone.is_loaded());
        assert_eq!(clone.get().unwrap().schema().len(), 1);
    }

    #[test]
    fn test_second_install_rejected() {
        let handle = ModelHandle::ready(model(&["tenure"]));
        assert_eq!(handle.install(model(&["tenure", "Partner"])), Err(AlreadyLoaded));
        assert_eq!(handle.get().unwrap().schema().len(), 1);
    }

    #[test]
    fn test_model_without_feature_names_is_not_ready() {
        let classifier = LogisticClassifier::new(Vec::new(), Vec::new(), 0.0);
        let err = ReadyModel::new(Arc::new(classifier), "memory").unwrap_err();
        assert_eq!(err, SchemaError::NoFeatureNames);
    }
}
