//! Custom Test Assertions
//!
//! Assertion helpers for engine results that print the reasoning and check
//! trail on failure instead of a bare `left != right`.

use domain_claims::{
    DecisionOutcome, EligibilityDecision, EligibilityResult, FinalDecision, ReviewRecord,
};

/// Tolerance used when comparing confidence scores
pub const SCORE_EPSILON: f64 = 1e-9;

/// Asserts two scores are equal within [`SCORE_EPSILON`]
pub fn assert_score_eq(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= SCORE_EPSILON,
        "Score mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts the decision and confidence of an eligibility result
///
/// # Panics
///
/// Panics with the result's reasoning and check trail on mismatch
pub fn assert_eligibility(result: &EligibilityResult, decision: EligibilityDecision, confidence: f64) {
    assert_eq!(
        result.decision, decision,
        "Unexpected decision: reasoning={:?}, checks_failed={:?}, trail={:?}",
        result.reasoning, result.checks_failed, result.check_trail
    );
    assert!(
        (result.confidence_score - confidence).abs() <= SCORE_EPSILON,
        "Unexpected confidence {} (expected {}): ambiguity={:?}",
        result.confidence_score,
        confidence,
        result.ambiguity_factors
    );
}

/// Asserts the confidence is a valid percentage
pub fn assert_confidence_in_range(result: &EligibilityResult) {
    assert!(
        (0.0..=100.0).contains(&result.confidence_score),
        "Confidence out of range: {}",
        result.confidence_score
    );
}

/// Unwraps an escalated outcome
pub fn assert_escalated(outcome: DecisionOutcome) -> ReviewRecord {
    match outcome {
        DecisionOutcome::Escalated(record) => record,
        DecisionOutcome::Finalized(decision) => panic!(
            "Expected escalation, claim was finalized as {:?}: {}",
            decision.disposition, decision.eligibility.reasoning
        ),
    }
}

/// Unwraps a finalized outcome
pub fn assert_finalized(outcome: DecisionOutcome) -> FinalDecision {
    match outcome {
        DecisionOutcome::Finalized(decision) => decision,
        DecisionOutcome::Escalated(record) => panic!(
            "Expected finalization, claim was escalated: {}",
            record.flag_reason
        ),
    }
}

/// Asserts the recorded audit actions, in order
pub fn assert_audit_actions(actual: &[String], expected: &[&str]) {
    let actual: Vec<&str> = actual.iter().map(String::as_str).collect();
    assert_eq!(actual, expected, "Audit trail mismatch");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_eq_tolerates_rounding() {
        assert_score_eq(0.1 + 0.2, 0.3);
    }

    #[test]
    #[should_panic(expected = "Unexpected decision")]
    fn test_eligibility_mismatch_panics() {
        let result = EligibilityResult::error("no claim");
        assert_eligibility(&result, EligibilityDecision::Eligible, 0.0);
    }
}
