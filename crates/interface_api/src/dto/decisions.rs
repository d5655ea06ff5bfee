//! Decision DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

use domain_claims::{
    ClaimFacts, DecisionRequest, ExclusionAssessment, ExclusionSignal, FraudSignal, PolicySnapshot,
};

/// Reason recorded when the caller sends no fraud probability at all
pub const FRAUD_SCORE_NOT_SUPPLIED: &str = "fraud score not supplied";

/// Extracted claim facts, the policy on file and the outputs of the fraud
/// model and exclusion classifier
///
/// Either document may be absent; the engine turns that into an ERROR
/// decision that goes to review rather than a request failure. Without an
/// exclusion verdict or reason the exclusion check is skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DecideClaimRequest {
    pub claim: Option<ClaimFacts>,
    pub policy: Option<PolicySnapshot>,
    #[validate(range(min = 0.0, max = 1.0, message = "must be within [0, 1]"))]
    pub fraud_probability: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0, message = "must be within [0, 1]"))]
    pub fraud_threshold: Option<f64>,
    /// Why the fraud model could not be consulted
    #[validate(length(max = 500))]
    pub fraud_unavailable_reason: Option<String>,
    pub exclusion: Option<ExclusionAssessment>,
    /// Why the exclusion classifier could not be consulted
    #[validate(length(max = 500))]
    pub exclusion_unavailable_reason: Option<String>,
}

impl From<DecideClaimRequest> for DecisionRequest {
    fn from(dto: DecideClaimRequest) -> Self {
        let fraud = match dto.fraud_probability {
            Some(probability) => FraudSignal::Scored {
                probability,
                threshold: dto.fraud_threshold,
            },
            None => FraudSignal::Unavailable {
                reason: dto
                    .fraud_unavailable_reason
                    .unwrap_or_else(|| FRAUD_SCORE_NOT_SUPPLIED.to_string()),
            },
        };

        let exclusion = match (dto.exclusion, dto.exclusion_unavailable_reason) {
            (Some(assessment), _) => Some(ExclusionSignal::Assessed(assessment)),
            (None, Some(reason)) => Some(ExclusionSignal::Unavailable { reason }),
            (None, None) => None,
        };

        DecisionRequest {
            claim: dto.claim,
            policy: dto.policy,
            fraud,
            exclusion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_probability_means_unavailable() {
        let request: DecisionRequest = DecideClaimRequest::default().into();
        assert_eq!(
            request.fraud,
            FraudSignal::Unavailable {
                reason: FRAUD_SCORE_NOT_SUPPLIED.to_string()
            }
        );
    }

    #[test]
    fn test_probability_out_of_range_fails_validation() {
        let dto = DecideClaimRequest {
            fraud_probability: Some(1.2),
            ..DecideClaimRequest::default()
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_threshold_carried_with_probability() {
        let dto = DecideClaimRequest {
            fraud_probability: Some(0.72),
            fraud_threshold: Some(0.65),
            ..DecideClaimRequest::default()
        };
        assert!(dto.validate().is_ok());
        let request: DecisionRequest = dto.into();
        assert_eq!(
            request.fraud,
            FraudSignal::Scored {
                probability: 0.72,
                threshold: Some(0.65)
            }
        );
    }

    #[test]
    fn test_exclusion_verdict_is_passed_through() {
        let verdict = ExclusionAssessment {
            is_excluded: true,
            confidence: 85.0,
            matched_exclusion: Some("Racing".to_string()),
            reasoning: "Track day".to_string(),
        };
        let request: DecisionRequest = DecideClaimRequest {
            exclusion: Some(verdict.clone()),
            exclusion_unavailable_reason: Some("ignored".to_string()),
            ..DecideClaimRequest::default()
        }
        .into();
        assert_eq!(request.exclusion, Some(ExclusionSignal::Assessed(verdict)));

        let request: DecisionRequest = DecideClaimRequest {
            exclusion_unavailable_reason: Some("classifier timeout".to_string()),
            ..DecideClaimRequest::default()
        }
        .into();
        assert_eq!(
            request.exclusion,
            Some(ExclusionSignal::Unavailable {
                reason: "classifier timeout".to_string()
            })
        );
        assert_eq!(DecisionRequest::from(DecideClaimRequest::default()).exclusion, None);
    }
}
