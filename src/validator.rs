//! Request validation against the active feature schema.

use crate::error::ValidationError;
use crate::schema::{FeatureKind, FeatureSchema, FeatureSpec};
use crate::types::request::{json_type_name, InferenceRequest};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Request whose schema fields passed every constraint.
///
/// Only [`RequestValidator::validate`] can build one, so the canonicalizer
/// never sees unchecked input. Fields outside the schema are not carried.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    values: HashMap<String, f64>,
}

impl ValidatedRequest {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Checks presence, type and range of every schema feature.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    schema: Arc<FeatureSchema>,
}

impl RequestValidator {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    /// Validate a raw request. Stops at the first violation.
    pub fn validate(&self, request: &InferenceRequest) -> Result<ValidatedRequest, ValidationError> {
        let mut values = HashMap::with_capacity(self.schema.len());

        for spec in self.schema.features() {
            match request.get(&spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        return Err(ValidationError::new(&spec.name, "field required"));
                    }
                }
                Some(value) => {
                    let number = check_value(spec, value)?;
                    values.insert(spec.name.clone(), number);
                }
            }
        }

        Ok(ValidatedRequest { values })
    }
}

fn check_value(spec: &FeatureSpec, value: &Value) -> Result<f64, ValidationError> {
    let number = value.as_f64().ok_or_else(|| {
        ValidationError::new(
            &spec.name,
            format!("expected a number, got {}", json_type_name(value)),
        )
    })?;

    // Model input is f32
    if !number.is_finite() || !(number as f32).is_finite() {
        return Err(ValidationError::new(&spec.name, "must be a finite number"));
    }

    match spec.kind {
        FeatureKind::Binary => {
            if number != 0.0 && number != 1.0 {
                return Err(ValidationError::new(&spec.name, "must be 0 or 1"));
            }
        }
        FeatureKind::Integer => {
            if number.fract() != 0.0 {
                return Err(ValidationError::new(&spec.name, "must be an integer"));
            }
        }
        FeatureKind::Continuous => {}
    }

    if number < spec.min {
        return Err(ValidationError::new(
            &spec.name,
            format!("must be >= {}", spec.min),
        ));
    }
    if let Some(max) = spec.max {
        if number > max {
            return Err(ValidationError::new(&spec.name, format!("must be <= {}", max)));
        }
    }

    Ok(number)
}
