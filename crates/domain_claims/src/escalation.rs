//! Escalation policy
//!
//! Decides whether a machine decision may be applied automatically or must
//! wait for a human. Fraud always overrides automation, and so does any
//! failed check that names a configured edge case.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EscalationConfig;

/// Why a claim was routed to a reviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum EscalationTrigger {
    LowConfidence { confidence: f64, threshold: f64 },
    FraudFlagged,
    EdgeCase { check: String, matched: String },
    /// Evaluation could not run on the inputs supplied
    EvaluationError,
    /// No usable fraud probability reached the engine
    FraudScoreUnavailable { reason: String },
}

impl fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationTrigger::LowConfidence { confidence, threshold } => write!(
                f,
                "Low confidence score ({:.1}% < {:.1}%) - manual validation required",
                confidence, threshold
            ),
            EscalationTrigger::FraudFlagged => write!(f, "Fraud model flagged the claim"),
            EscalationTrigger::EdgeCase { check, matched } => {
                write!(f, "Edge case '{}' in failed check: {}", matched, check)
            }
            EscalationTrigger::EvaluationError => {
                write!(f, "Eligibility evaluation could not complete")
            }
            EscalationTrigger::FraudScoreUnavailable { reason } => {
                write!(f, "Fraud score unavailable: {}", reason)
            }
        }
    }
}

/// Applies the configured escalation rules
#[derive(Debug, Clone, Default)]
pub struct EscalationPolicy {
    config: EscalationConfig,
}

impl EscalationPolicy {
    pub fn new(config: EscalationConfig) -> Self {
        Self { config }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.config.confidence_threshold
    }

    /// Lists every rule the decision trips, in rule order
    pub fn assess(
        &self,
        confidence: f64,
        checks_failed: &[String],
        fraud_flag: bool,
    ) -> Vec<EscalationTrigger> {
        let mut triggers = Vec::new();

        if confidence < self.config.confidence_threshold {
            triggers.push(EscalationTrigger::LowConfidence {
                confidence,
                threshold: self.config.confidence_threshold,
            });
        }
        if fraud_flag {
            triggers.push(EscalationTrigger::FraudFlagged);
        }
        for check in checks_failed {
            let lowered = check.to_lowercase();
            if let Some(edge) = self
                .config
                .edge_cases
                .iter()
                .find(|edge| lowered.contains(&edge.to_lowercase()))
            {
                triggers.push(EscalationTrigger::EdgeCase {
                    check: check.clone(),
                    matched: edge.clone(),
                });
            }
        }

        triggers
    }

    /// True when a human must decide
    pub fn needs_review(&self, confidence: f64, checks_failed: &[String], fraud_flag: bool) -> bool {
        !self.assess(confidence, checks_failed, fraud_flag).is_empty()
    }
}

/// Joins triggers into the flag reason stored on a review record
pub fn describe(triggers: &[EscalationTrigger]) -> String {
    triggers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_confident_clean_decision_is_auto_applied() {
        let policy = EscalationPolicy::default();
        assert!(!policy.needs_review(95.0, &[], false));
        assert!(!policy.needs_review(50.0, &[], false));
    }

    #[test]
    fn test_low_confidence_escalates() {
        let policy = EscalationPolicy::default();
        let triggers = policy.assess(49.9, &[], false);
        assert_eq!(triggers.len(), 1);
        assert!(matches!(triggers[0], EscalationTrigger::LowConfidence { .. }));
    }

    #[test]
    fn test_fraud_overrides_confidence() {
        let policy = EscalationPolicy::default();
        assert!(policy.needs_review(95.0, &[], true));
    }

    #[test]
    fn test_edge_case_match_is_case_insensitive() {
        let policy = EscalationPolicy::default();
        let failed = vec!["Detected HIGH_VALUE_CLAIM on policy".to_string()];
        let triggers = policy.assess(90.0, &failed, false);
        assert_eq!(
            triggers,
            vec![EscalationTrigger::EdgeCase {
                check: failed[0].clone(),
                matched: "high_value_claim".to_string(),
            }]
        );
    }

    #[test]
    fn test_ordinary_failed_checks_do_not_escalate() {
        let policy = EscalationPolicy::default();
        let failed = vec!["Claim amount exceeded available limit".to_string()];
        assert!(!policy.needs_review(95.0, &failed, false));
    }

    #[test]
    fn test_describe_joins_triggers() {
        let text = describe(&[
            EscalationTrigger::FraudFlagged,
            EscalationTrigger::EvaluationError,
        ]);
        assert_eq!(
            text,
            "Fraud model flagged the claim; Eligibility evaluation could not complete"
        );
    }

    proptest! {
        #[test]
        fn needs_review_whenever_confidence_below_threshold(c in 0.0f64..50.0) {
            let policy = EscalationPolicy::default();
            prop_assert!(policy.needs_review(c, &[], false));
        }

        #[test]
        fn lowering_confidence_never_removes_review(c1 in 0.0f64..=100.0, c2 in 0.0f64..=100.0, fraud in any::<bool>()) {
            let policy = EscalationPolicy::default();
            let (low, high) = if c1 <= c2 { (c1, c2) } else { (c2, c1) };
            if policy.needs_review(high, &[], fraud) {
                prop_assert!(policy.needs_review(low, &[], fraud));
            }
        }
    }
}
