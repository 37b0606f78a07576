//! Inference request as received from callers

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw customer record: feature name to JSON value.
///
/// Untyped on purpose; constraints are applied by
/// [`crate::validator::RequestValidator`] against the active schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InferenceRequest {
    fields: Map<String, Value>,
}

impl InferenceRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, builder style
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl TryFrom<Value> for InferenceRequest {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ValidationError::new(
                "$",
                format!("request must be a JSON object, got {}", json_type_name(&other)),
            )),
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_deserializes_from_object() {
        let request: InferenceRequest =
            serde_json::from_value(json!({"tenure": 12, "MonthlyCharges": 70.0})).unwrap();
        assert_eq!(request.len(), 2);
        assert_eq!(request.get("tenure"), Some(&json!(12)));
    }

    #[test]
    fn test_non_object_rejected() {
        let err = InferenceRequest::try_from(json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.field, "$");
        assert!(err.constraint.contains("array"));
    }
}
