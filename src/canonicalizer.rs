//! Feature canonicalization for model inference.
//!
//! Turns a validated request into a feature vector in the exact column order
//! the loaded model was fit on. The model cannot detect a permuted vector of
//! the right width, so this is the only place order is decided.

use crate::schema::FeatureSchema;
use crate::validator::ValidatedRequest;
use std::sync::Arc;

/// Feature vector aligned 1:1 with the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    values: Vec<f32>,
}

impl CanonicalRecord {
    /// Wrap an already ordered vector. Callers are responsible for the order.
    pub fn from_ordered(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Reorders request fields into schema order, filling defaults.
#[derive(Debug, Clone)]
pub struct FeatureCanonicalizer {
    schema: Arc<FeatureSchema>,
}

impl FeatureCanonicalizer {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    /// Element `i` of the result is always schema feature `i`.
    pub fn canonicalize(&self, request: &ValidatedRequest) -> CanonicalRecord {
        let values = self
            .schema
            .features()
            .iter()
            .map(|spec| request.value(&spec.name).unwrap_or(spec.default) as f32)
            .collect();

        CanonicalRecord { values }
    }

    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }
}
