//! Pre-built Test Fixtures
//!
//! Ready-to-use claims, policies and the reference scenarios the engine is
//! specified against. Values are fixed so assertions can be exact.

use domain_claims::{
    ClaimFacts, DecisionRequest, ExclusionAssessment, FraudSignal, PolicySnapshot, PolicyStatus,
};
use rust_decimal_macros::dec;

use crate::builders::{ClaimFactsBuilder, PolicySnapshotBuilder};

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn policy_number() -> &'static str {
        "POL-2024-000123"
    }

    pub fn policyholder_name() -> &'static str {
        "Jordan Avery"
    }

    /// A reason long enough to pass the completeness scan
    pub fn claim_reason() -> &'static str {
        "Rear-end collision at a junction while stationary"
    }

    pub fn exclusions() -> &'static str {
        "Racing or speed testing; driving under the influence; wear and tear"
    }

    pub fn reviewer_name() -> &'static str {
        "Morgan Reviewer"
    }
}

/// Fixture for date text as it appears on claim documents
pub struct DateFixtures;

impl DateFixtures {
    pub fn claim_date() -> &'static str {
        "2024-06-01"
    }

    pub fn policy_expiry() -> &'static str {
        "2024-12-31"
    }

    /// Day-first layout that only parses under `%d-%m-%Y`
    pub fn day_first_claim_date() -> &'static str {
        "14-11-2024"
    }
}

/// Fixture for exclusion classifier verdicts
pub struct ExclusionFixtures;

impl ExclusionFixtures {
    pub fn not_excluded() -> ExclusionAssessment {
        ExclusionAssessment {
            is_excluded: false,
            confidence: 90.0,
            matched_exclusion: None,
            reasoning: "Collision damage is not listed".to_string(),
        }
    }

    pub fn racing_excluded() -> ExclusionAssessment {
        ExclusionAssessment {
            is_excluded: true,
            confidence: 85.0,
            matched_exclusion: Some("Racing or speed testing".to_string()),
            reasoning: "Claim describes a track day".to_string(),
        }
    }

    pub fn uncertain() -> ExclusionAssessment {
        ExclusionAssessment {
            is_excluded: false,
            confidence: 30.0,
            matched_exclusion: None,
            reasoning: "Claim reason is vague".to_string(),
        }
    }
}

/// One reference case: inputs plus the fraud signal to send
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub claim: ClaimFacts,
    pub policy: PolicySnapshot,
    pub fraud: FraudSignal,
}

impl Scenario {
    pub fn request(&self) -> DecisionRequest {
        DecisionRequest {
            claim: Some(self.claim.clone()),
            policy: Some(self.policy.clone()),
            fraud: self.fraud.clone(),
            exclusion: None,
        }
    }
}

/// The reference scenarios
///
/// All share a 5000 claim against a 10000 limit with one prior claim.
pub struct Scenarios;

impl Scenarios {
    fn clean_fraud() -> FraudSignal {
        FraudSignal::Scored {
            probability: 0.05,
            threshold: Some(0.65),
        }
    }

    fn base_claim() -> ClaimFacts {
        ClaimFactsBuilder::new().with_amount(dec!(5000)).build()
    }

    fn base_policy() -> PolicySnapshotBuilder {
        PolicySnapshotBuilder::new()
            .with_limit(dec!(10000))
            .with_history_count(1)
            .with_status(PolicyStatus::Active)
    }

    /// Past claims 8000 leave 2000 available: NOT_ELIGIBLE at 95
    pub fn a_limit_exceeded() -> Scenario {
        Scenario {
            name: "A",
            claim: Self::base_claim(),
            policy: Self::base_policy().with_past_claims(dec!(8000)).build(),
            fraud: Self::clean_fraud(),
        }
    }

    /// Past claims 2000: ELIGIBLE at 95, new past claims 7000
    pub fn b_eligible() -> Scenario {
        Scenario {
            name: "B",
            claim: Self::base_claim(),
            policy: Self::base_policy().with_past_claims(dec!(2000)).build(),
            fraud: Self::clean_fraud(),
        }
    }

    /// Expired policy: NOT_ELIGIBLE at 100
    pub fn c_expired() -> Scenario {
        Scenario {
            name: "C",
            claim: Self::base_claim(),
            policy: Self::base_policy()
                .with_past_claims(dec!(2000))
                .with_status(PolicyStatus::parse("Expired"))
                .build(),
            fraud: Self::clean_fraud(),
        }
    }

    /// Eligible claim with a 0.72 fraud probability against 0.65
    pub fn d_fraud_flagged() -> Scenario {
        Scenario {
            name: "D",
            fraud: FraudSignal::Scored {
                probability: 0.72,
                threshold: Some(0.65),
            },
            ..Self::b_eligible()
        }
    }

    /// Claim and expiry dates written in different layouts
    pub fn e_mismatched_dates() -> Scenario {
        Scenario {
            name: "E",
            claim: ClaimFactsBuilder::new()
                .with_amount(dec!(5000))
                .with_claim_date(DateFixtures::day_first_claim_date())
                .build(),
            policy: Self::base_policy()
                .with_past_claims(dec!(2000))
                .with_expiry_date("2024-11-20")
                .build(),
            fraud: Self::clean_fraud(),
        }
    }

    pub fn all() -> Vec<Scenario> {
        vec![
            Self::a_limit_exceeded(),
            Self::b_eligible(),
            Self::c_expired(),
            Self::d_fraud_flagged(),
            Self::e_mismatched_dates(),
        ]
    }
}
