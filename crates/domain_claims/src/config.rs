//! Engine tunables
//!
//! The scoring weights and confidence formulas are empirically tuned values
//! carried over unchanged from production. They are kept here as data so that
//! they can be adjusted without touching check logic; the defaults reproduce
//! the production behaviour exactly.

use serde::{Deserialize, Serialize};

use core_kernel::CoreError;

/// Weights and confidences used by the eligibility evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    // Completeness scan
    pub missing_amount_weight: f64,
    pub short_reason_weight: f64,
    /// Reasons shorter than this many characters count as insufficient
    pub min_reason_chars: usize,
    pub unknown_status_weight: f64,
    pub missing_expiry_weight: f64,
    pub missing_claim_date_weight: f64,
    pub missing_limit_weight: f64,

    // Limit check
    pub borderline_weight: f64,
    pub borderline_low_pct: f64,
    pub borderline_high_pct: f64,
    pub limit_reject_confidence: f64,

    // Status check
    pub status_reject_confidence: f64,

    // Frequency check
    pub max_claim_count: u32,
    pub frequency_reject_confidence: f64,

    // Temporal check
    pub unparseable_dates_weight: f64,
    pub date_reject_confidence: f64,

    // Exclusion check
    pub exclusion_confidence_floor: f64,
    pub exclusion_unavailable_weight: f64,

    // Eligible outcome
    pub eligible_base_confidence: f64,
    pub eligible_min_confidence: f64,

    // Non short-circuit rejection tiers
    pub high_ambiguity: f64,
    pub medium_ambiguity: f64,
    pub high_ambiguity_base: f64,
    pub high_ambiguity_floor: f64,
    pub medium_ambiguity_base: f64,
    pub low_ambiguity_base: f64,
    pub low_ambiguity_floor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            missing_amount_weight: 20.0,
            short_reason_weight: 15.0,
            min_reason_chars: 10,
            unknown_status_weight: 25.0,
            missing_expiry_weight: 15.0,
            missing_claim_date_weight: 10.0,
            missing_limit_weight: 20.0,
            borderline_weight: 10.0,
            borderline_low_pct: 90.0,
            borderline_high_pct: 110.0,
            limit_reject_confidence: 95.0,
            status_reject_confidence: 100.0,
            max_claim_count: 4,
            frequency_reject_confidence: 95.0,
            unparseable_dates_weight: 20.0,
            date_reject_confidence: 95.0,
            exclusion_confidence_floor: 60.0,
            exclusion_unavailable_weight: 10.0,
            eligible_base_confidence: 95.0,
            eligible_min_confidence: 30.0,
            high_ambiguity: 50.0,
            medium_ambiguity: 30.0,
            high_ambiguity_base: 40.0,
            high_ambiguity_floor: 20.0,
            medium_ambiguity_base: 50.0,
            low_ambiguity_base: 90.0,
            low_ambiguity_floor: 75.0,
        }
    }
}

impl ScoringConfig {
    /// Confidence for an ELIGIBLE outcome
    pub fn eligible_confidence(&self, ambiguity: f64) -> f64 {
        (self.eligible_base_confidence - ambiguity).max(self.eligible_min_confidence)
    }

    /// Confidence for a NOT_ELIGIBLE outcome reached without short-circuit
    ///
    /// ```text
    /// a >= 50        max(40 - (a - 50) / 2, 20)
    /// 30 <= a < 50   50 + (50 - a)
    /// a < 30         max(90 - a, 75)
    /// ```
    pub fn tiered_rejection_confidence(&self, ambiguity: f64) -> f64 {
        if ambiguity >= self.high_ambiguity {
            (self.high_ambiguity_base - (ambiguity - self.high_ambiguity) / 2.0)
                .max(self.high_ambiguity_floor)
        } else if ambiguity >= self.medium_ambiguity {
            self.medium_ambiguity_base + (self.high_ambiguity - ambiguity)
        } else {
            (self.low_ambiguity_base - ambiguity).max(self.low_ambiguity_floor)
        }
    }

    /// Extra ambiguity for a low-confidence exclusion verdict, `(60 - c) / 2`
    pub fn exclusion_ambiguity(&self, classifier_confidence: f64) -> f64 {
        let confidence = classifier_confidence.clamp(0.0, 100.0);
        if confidence < self.exclusion_confidence_floor {
            (self.exclusion_confidence_floor - confidence) / 2.0
        } else {
            0.0
        }
    }
}

/// Rules that force a claim into human review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Decisions below this confidence are never auto-applied
    pub confidence_threshold: f64,
    /// Failed-check fragments that always need a human
    pub edge_cases: Vec<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 50.0,
            edge_cases: vec![
                "policy_expiry_ambiguous".to_string(),
                "conflicting_information".to_string(),
                "high_value_claim".to_string(),
                "multiple_simultaneous_claims".to_string(),
            ],
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub escalation: EscalationConfig,
    /// Threshold applied when the fraud source does not state one
    pub default_fraud_threshold: f64,
    /// Undelivered audit events held for retry before the oldest is dropped
    pub audit_backlog_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            escalation: EscalationConfig::default(),
            default_fraud_threshold: 0.5,
            audit_backlog_capacity: 10_000,
        }
    }
}

impl EngineConfig {
    /// Rejects values the engine cannot work with
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(0.0..=1.0).contains(&self.default_fraud_threshold) {
            return Err(CoreError::configuration(format!(
                "default fraud threshold must be within [0, 1], got {}",
                self.default_fraud_threshold
            )));
        }
        if !(0.0..=100.0).contains(&self.escalation.confidence_threshold) {
            return Err(CoreError::configuration(format!(
                "review confidence threshold must be within [0, 100], got {}",
                self.escalation.confidence_threshold
            )));
        }
        if self.audit_backlog_capacity == 0 {
            return Err(CoreError::configuration("audit backlog capacity must be positive"));
        }
        if self.scoring.borderline_low_pct > self.scoring.borderline_high_pct {
            return Err(CoreError::configuration("borderline band is inverted"));
        }
        Ok(())
    }
}
