//! Prediction outcome and the fixed-threshold response classifier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probability above which a prediction is decisive towards churn
const HIGH_UPPER: f64 = 0.7;
/// Probability below which a prediction is decisive towards staying
const HIGH_LOWER: f64 = 0.3;
const MEDIUM_UPPER: f64 = 0.6;
const MEDIUM_LOWER: f64 = 0.4;
/// Above this the customer is flagged for monitoring
const MONITOR_THRESHOLD: f64 = 0.5;

pub const RECOMMEND_URGENT: &str =
    "High churn risk! Contact customer immediately with retention offer.";
pub const RECOMMEND_MONITOR: &str =
    "Moderate risk. Monitor customer satisfaction and engagement.";
pub const RECOMMEND_UPSELL: &str =
    "Low risk. Customer likely to stay. Focus on upselling opportunities.";

/// Binary churn label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChurnLabel {
    #[serde(rename = "Will Churn")]
    WillChurn,
    #[serde(rename = "Will Not Churn")]
    WillNotChurn,
}

impl ChurnLabel {
    /// Label from the model's raw class prediction (1 = churn)
    pub fn from_raw(prediction: u8) -> Self {
        if prediction == 1 {
            ChurnLabel::WillChurn
        } else {
            ChurnLabel::WillNotChurn
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChurnLabel::WillChurn => "Will Churn",
            ChurnLabel::WillNotChurn => "Will Not Churn",
        }
    }
}

impl fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How decisive a probability is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Tier for a churn probability.
    ///
    /// High is checked first, so the Medium condition only ever matches
    /// (0.3, 0.4) and (0.6, 0.7].
    pub fn from_probability(probability: f64) -> Self {
        if probability > HIGH_UPPER || probability < HIGH_LOWER {
            Confidence::High
        } else if probability > MEDIUM_UPPER || probability < MEDIUM_LOWER {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "Low",
            Confidence::Medium => "Medium",
            Confidence::High => "High",
        }
    }
}

/// Retention recommendation for a churn probability
pub fn recommendation_for(probability: f64) -> &'static str {
    if probability > HIGH_UPPER {
        RECOMMEND_URGENT
    } else if probability > MONITOR_THRESHOLD {
        RECOMMEND_MONITOR
    } else {
        RECOMMEND_UPSELL
    }
}

/// Derive confidence tier and recommendation from a raw probability.
pub fn classify(probability: f64) -> (Confidence, &'static str) {
    (
        Confidence::from_probability(probability),
        recommendation_for(probability),
    )
}

/// Round a probability to four decimals for responses
pub fn round_probability(probability: f64) -> f64 {
    (probability * 10_000.0).round() / 10_000.0
}

/// Final result of one inference request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub label: ChurnLabel,
    pub probability: f64,
    pub confidence: Confidence,
    pub recommendation: String,
    pub timestamp: DateTime<Utc>,
}

impl PredictionOutcome {
    /// Build an outcome from the model's class prediction and churn probability
    pub fn new(prediction: u8, probability: f64) -> Self {
        let (confidence, recommendation) = classify(probability);
        Self {
            label: ChurnLabel::from_raw(prediction),
            probability,
            confidence,
            recommendation: recommendation.to_string(),
            timestamp: Utc::now(),
        }
    }
}
