//! Fraud risk classification
//!
//! The fraud model is hosted elsewhere; only its probability reaches the
//! engine. Buckets are relative to the threshold in effect, so tightening
//! the threshold shifts every band with it.
//!
//! ```text
//!   p >= t         High Risk (Fraud Detected)
//!   p >= t - 0.2   Medium Risk
//!   p >= t - 0.4   Low Risk
//!   otherwise      Very Low Risk
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClaimError;

/// Discrete fraud risk, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Very Low Risk")]
    VeryLow,
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk (Fraud Detected)")]
    High,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "Very Low Risk",
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk (Fraud Detected)",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classified fraud signal for one claim
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    pub fraud_probability: f64,
    /// 1 when the probability reached the threshold
    pub fraud_prediction: u8,
    pub risk_level: RiskLevel,
    pub threshold_used: f64,
}

impl FraudAssessment {
    pub fn is_fraud(&self) -> bool {
        self.fraud_prediction == 1
    }

    /// Advisory text for reviewers, banded on the raw probability
    pub fn recommendation(&self) -> &'static str {
        let p = self.fraud_probability;
        if p >= 0.7 {
            "REJECT - High fraud risk detected. Thorough investigation required."
        } else if p >= 0.5 {
            "REVIEW - Moderate fraud risk. Manual verification strongly recommended."
        } else if p >= 0.3 {
            "CAUTION - Minor fraud indicators detected. Standard verification recommended."
        } else {
            "PROCEED - No significant fraud indicators detected."
        }
    }
}

/// Maps a probability onto a risk bucket against `threshold`
pub fn classify(probability: f64, threshold: f64) -> FraudAssessment {
    let risk_level = if probability >= threshold {
        RiskLevel::High
    } else if probability >= threshold - 0.2 {
        RiskLevel::Medium
    } else if probability >= threshold - 0.4 {
        RiskLevel::Low
    } else {
        RiskLevel::VeryLow
    };

    FraudAssessment {
        fraud_probability: probability,
        fraud_prediction: u8::from(probability >= threshold),
        risk_level,
        threshold_used: threshold,
    }
}

/// Accepts only finite probabilities within `[0, 1]`
pub fn validate_probability(probability: f64) -> Result<f64, ClaimError> {
    if probability.is_finite() && (0.0..=1.0).contains(&probability) {
        Ok(probability)
    } else {
        Err(ClaimError::InvalidFraudScore(probability))
    }
}
