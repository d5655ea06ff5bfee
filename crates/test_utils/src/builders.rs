//! Test Data Builders
//!
//! Builder patterns for constructing engine inputs with sensible defaults.
//! Defaults describe a complete, clean claim against an active policy, so a
//! test only sets the fields it is about.

use domain_claims::{
    AnalysisResult, ClaimFacts, DriverProfile, EligibilityResult, PolicySnapshot, PolicyStatus,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{DateFixtures, StringFixtures};

/// Builder for claim facts
#[derive(Debug, Clone)]
pub struct ClaimFactsBuilder {
    facts: ClaimFacts,
}

impl Default for ClaimFactsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimFactsBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            facts: ClaimFacts {
                policy_number: Some(StringFixtures::policy_number().to_string()),
                policyholder_name: Some(StringFixtures::policyholder_name().to_string()),
                claim_amount: Some(dec!(2500.00)),
                claim_date: Some(DateFixtures::claim_date().to_string()),
                reason_for_claim: Some(StringFixtures::claim_reason().to_string()),
                driver: DriverProfile::default(),
            },
        }
    }

    /// Starts from a claim where extraction found nothing
    pub fn empty() -> Self {
        Self {
            facts: ClaimFacts::default(),
        }
    }

    pub fn with_policy_number(mut self, number: impl Into<String>) -> Self {
        self.facts.policy_number = Some(number.into());
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.facts.claim_amount = Some(amount);
        self
    }

    pub fn without_amount(mut self) -> Self {
        self.facts.claim_amount = None;
        self
    }

    pub fn with_claim_date(mut self, date: impl Into<String>) -> Self {
        self.facts.claim_date = Some(date.into());
        self
    }

    pub fn without_claim_date(mut self) -> Self {
        self.facts.claim_date = None;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.facts.reason_for_claim = Some(reason.into());
        self
    }

    pub fn with_driver(mut self, driver: DriverProfile) -> Self {
        self.facts.driver = driver;
        self
    }

    pub fn build(self) -> ClaimFacts {
        self.facts
    }
}

/// Builder for policy snapshots
#[derive(Debug, Clone)]
pub struct PolicySnapshotBuilder {
    snapshot: PolicySnapshot,
}

impl Default for PolicySnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicySnapshotBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: PolicySnapshot {
                policy_number: Some(StringFixtures::policy_number().to_string()),
                policy_limit: Some(dec!(10000.00)),
                past_claims_amount: Some(Decimal::ZERO),
                claim_history_count: Some(0),
                policy_status: PolicyStatus::Active,
                policy_expiry_date: Some(DateFixtures::policy_expiry().to_string()),
                exclusions: Some(StringFixtures::exclusions().to_string()),
            },
        }
    }

    pub fn with_policy_number(mut self, number: impl Into<String>) -> Self {
        self.snapshot.policy_number = Some(number.into());
        self
    }

    pub fn with_limit(mut self, limit: Decimal) -> Self {
        self.snapshot.policy_limit = Some(limit);
        self
    }

    pub fn without_limit(mut self) -> Self {
        self.snapshot.policy_limit = None;
        self
    }

    pub fn with_past_claims(mut self, amount: Decimal) -> Self {
        self.snapshot.past_claims_amount = Some(amount);
        self
    }

    pub fn with_history_count(mut self, count: u32) -> Self {
        self.snapshot.claim_history_count = Some(count);
        self
    }

    pub fn with_status(mut self, status: PolicyStatus) -> Self {
        self.snapshot.policy_status = status;
        self
    }

    pub fn with_expiry_date(mut self, date: impl Into<String>) -> Self {
        self.snapshot.policy_expiry_date = Some(date.into());
        self
    }

    pub fn without_expiry_date(mut self) -> Self {
        self.snapshot.policy_expiry_date = None;
        self
    }

    pub fn with_exclusions(mut self, exclusions: impl Into<String>) -> Self {
        self.snapshot.exclusions = Some(exclusions.into());
        self
    }

    pub fn build(self) -> PolicySnapshot {
        self.snapshot
    }
}

/// Analysis result for queue tests that do not run the evaluator
pub fn analysis_with_confidence(confidence: f64) -> AnalysisResult {
    let mut eligibility = EligibilityResult::error("Synthetic analysis for queue tests");
    eligibility.confidence_score = confidence;
    AnalysisResult {
        eligibility,
        fraud: None,
        triggers: Vec::new(),
        policy: Some(PolicySnapshotBuilder::new().build()),
    }
}
