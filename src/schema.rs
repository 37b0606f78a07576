//! Feature schema for churn model inference.
//!
//! The schema is the ordered list of features the active model was fit on,
//! each paired with hand-authored constraints from the feature catalog.
//! Order comes from the model's metadata, never from the catalog.

use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// Column order produced by the training preprocessing step
/// (source columns first, then one-hot columns with the first level dropped).
pub const REFERENCE_FEATURE_ORDER: [&str; 30] = [
    "SeniorCitizen",
    "Partner",
    "Dependents",
    "tenure",
    "PhoneService",
    "PaperlessBilling",
    "MonthlyCharges",
    "TotalCharges",
    "gender_Male",
    "MultipleLines_No_phone_service",
    "MultipleLines_Yes",
    "InternetService_Fiber_optic",
    "InternetService_No",
    "OnlineSecurity_No_internet_service",
    "OnlineSecurity_Yes",
    "OnlineBackup_No_internet_service",
    "OnlineBackup_Yes",
    "DeviceProtection_No_internet_service",
    "DeviceProtection_Yes",
    "TechSupport_No_internet_service",
    "TechSupport_Yes",
    "StreamingTV_No_internet_service",
    "StreamingTV_Yes",
    "StreamingMovies_No_internet_service",
    "StreamingMovies_Yes",
    "Contract_One_year",
    "Contract_Two_year",
    "PaymentMethod_Credit_card_automatic",
    "PaymentMethod_Electronic_check",
    "PaymentMethod_Mailed_check",
];

/// Value domain of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// 0/1 flag
    Binary,
    /// Whole number within range
    Integer,
    /// Any finite number within range
    Continuous,
}

/// One schema column with its validation constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
    pub min: f64,
    /// `None` means unbounded above
    pub max: Option<f64>,
    /// Value used when an optional feature is omitted
    pub default: f64,
    pub required: bool,
}

impl FeatureSpec {
    fn binary(name: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: FeatureKind::Binary,
            min: 0.0,
            max: Some(1.0),
            default: 0.0,
            required,
        }
    }

    /// Catalog entry for a known churn feature.
    pub fn from_catalog(name: &str) -> Option<Self> {
        let spec = match name {
            "tenure" => Self {
                name: name.to_string(),
                kind: FeatureKind::Integer,
                min: 0.0,
                max: Some(100.0),
                default: 0.0,
                required: true,
            },
            "MonthlyCharges" => Self {
                name: name.to_string(),
                kind: FeatureKind::Continuous,
                min: 0.0,
                max: Some(200.0),
                default: 0.0,
                required: true,
            },
            "TotalCharges" => Self {
                name: name.to_string(),
                kind: FeatureKind::Continuous,
                min: 0.0,
                max: None,
                default: 0.0,
                required: true,
            },
            "SeniorCitizen" | "Partner" | "Dependents" | "PhoneService" | "PaperlessBilling" => {
                Self::binary(name, true)
            }
            _ if REFERENCE_FEATURE_ORDER.contains(&name) => Self::binary(name, false),
            _ => return None,
        };
        Some(spec)
    }

    /// Permissive spec for model columns the catalog does not know.
    fn uncatalogued(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FeatureKind::Continuous,
            min: 0.0,
            max: None,
            default: 0.0,
            required: false,
        }
    }
}

/// Schema derivation failure. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("model exposes no feature names")]
    NoFeatureNames,

    #[error("duplicate feature name `{0}`")]
    DuplicateFeature(String),
}

/// Ordered, immutable feature schema of the loaded model.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    features: Vec<FeatureSpec>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build the schema from the model's feature names, preserving their order.
    pub fn from_feature_names<S: AsRef<str>>(names: &[S]) -> Result<Self, SchemaError> {
        if names.is_empty() {
            return Err(SchemaError::NoFeatureNames);
        }

        let mut features = Vec::with_capacity(names.len());
        let mut index = HashMap::with_capacity(names.len());

        for (position, name) in names.iter().enumerate() {
            let name = name.as_ref();
            if index.insert(name.to_string(), position).is_some() {
                return Err(SchemaError::DuplicateFeature(name.to_string()));
            }

            let spec = FeatureSpec::from_catalog(name).unwrap_or_else(|| {
                warn!(feature = %name, "Feature not in catalog, accepting any non-negative value");
                FeatureSpec::uncatalogued(name)
            });
            features.push(spec);
        }

        Ok(Self { features, index })
    }

    /// Schema in the reference training order.
    pub fn reference() -> Self {
        Self::from_feature_names(&REFERENCE_FEATURE_ORDER)
            .expect("reference feature order is non-empty and unique")
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    pub fn get(&self, name: &str) -> Option<&FeatureSpec> {
        self.index.get(name).map(|&i| &self.features[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }
}
