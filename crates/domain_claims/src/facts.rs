//! Evaluation inputs
//!
//! [`ClaimFacts`] is what the document extractor managed to pull out of a claim
//! form and [`PolicySnapshot`] is a point-in-time read of the policy record.
//! Both are assembled before evaluation begins and are never mutated. Every
//! field is optional because upstream extraction is unreliable; gaps are
//! scored as ambiguity rather than treated as failures.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Driver and demographic fields consumed by the fraud model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverProfile {
    pub driver_rating: Option<u8>,
    pub age: Option<u32>,
    pub sex: Option<String>,
    pub policy_type: Option<String>,
    pub accident_area: Option<String>,
    pub police_report_filed: Option<bool>,
    pub deductible: Option<Decimal>,
    pub week_of_month: Option<u8>,
    pub week_of_month_claimed: Option<u8>,
}

/// Claim fields extracted from the submitted documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimFacts {
    pub policy_number: Option<String>,
    pub policyholder_name: Option<String>,
    pub claim_amount: Option<Decimal>,
    /// Raw date text as written on the form
    pub claim_date: Option<String>,
    pub reason_for_claim: Option<String>,
    #[serde(default)]
    pub driver: DriverProfile,
}

impl ClaimFacts {
    /// True when extraction produced nothing usable at all
    pub fn is_empty(&self) -> bool {
        self.claim_amount.is_none()
            && non_blank(&self.policy_number).is_none()
            && non_blank(&self.claim_date).is_none()
            && non_blank(&self.reason_for_claim).is_none()
            && non_blank(&self.policyholder_name).is_none()
            && self.driver == DriverProfile::default()
    }

    pub fn claim_date(&self) -> Option<&str> {
        non_blank(&self.claim_date)
    }

    pub fn reason(&self) -> Option<&str> {
        non_blank(&self.reason_for_claim)
    }

    pub fn policy_number(&self) -> Option<&str> {
        non_blank(&self.policy_number)
    }
}

/// Lifecycle state of a policy as reported by the policy store
///
/// Labels are matched case-insensitively. Anything that is not a known label
/// is kept verbatim in [`PolicyStatus::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PolicyStatus {
    Active,
    Expired,
    Inactive,
    Cancelled,
    Terminated,
    #[default]
    Unknown,
    Unrecognized(String),
}

impl PolicyStatus {
    /// Parses a raw status label
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "active" | "valid" | "current" => PolicyStatus::Active,
            "expired" => PolicyStatus::Expired,
            "inactive" => PolicyStatus::Inactive,
            "cancelled" | "canceled" => PolicyStatus::Cancelled,
            "terminated" => PolicyStatus::Terminated,
            "" | "unknown" => PolicyStatus::Unknown,
            _ => PolicyStatus::Unrecognized(raw.trim().to_string()),
        }
    }

    /// Statuses that can never accept a claim
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PolicyStatus::Expired
                | PolicyStatus::Inactive
                | PolicyStatus::Cancelled
                | PolicyStatus::Terminated
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, PolicyStatus::Active)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, PolicyStatus::Unknown)
    }
}

impl From<String> for PolicyStatus {
    fn from(raw: String) -> Self {
        PolicyStatus::parse(&raw)
    }
}

impl From<&str> for PolicyStatus {
    fn from(raw: &str) -> Self {
        PolicyStatus::parse(raw)
    }
}

impl From<PolicyStatus> for String {
    fn from(status: PolicyStatus) -> Self {
        match status {
            PolicyStatus::Active => "active".to_string(),
            PolicyStatus::Expired => "expired".to_string(),
            PolicyStatus::Inactive => "inactive".to_string(),
            PolicyStatus::Cancelled => "cancelled".to_string(),
            PolicyStatus::Terminated => "terminated".to_string(),
            PolicyStatus::Unknown => "unknown".to_string(),
            PolicyStatus::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyStatus::Active => write!(f, "Active"),
            PolicyStatus::Expired => write!(f, "Expired"),
            PolicyStatus::Inactive => write!(f, "Inactive"),
            PolicyStatus::Cancelled => write!(f, "Cancelled"),
            PolicyStatus::Terminated => write!(f, "Terminated"),
            PolicyStatus::Unknown => write!(f, "Unknown"),
            PolicyStatus::Unrecognized(raw) => write!(f, "{}", raw),
        }
    }
}

/// Point-in-time read of a policy record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub policy_number: Option<String>,
    /// `None` when the store had no limit on file
    pub policy_limit: Option<Decimal>,
    pub past_claims_amount: Option<Decimal>,
    pub claim_history_count: Option<u32>,
    #[serde(default)]
    pub policy_status: PolicyStatus,
    /// Raw date text as stored
    pub policy_expiry_date: Option<String>,
    pub exclusions: Option<String>,
}

impl PolicySnapshot {
    pub fn past_claims(&self) -> Decimal {
        self.past_claims_amount.unwrap_or(Decimal::ZERO)
    }

    pub fn history_count(&self) -> u32 {
        self.claim_history_count.unwrap_or(0)
    }

    pub fn expiry_date(&self) -> Option<&str> {
        non_blank(&self.policy_expiry_date)
    }

    pub fn exclusions(&self) -> Option<&str> {
        non_blank(&self.exclusions)
    }
}

/// Policy counters proposed by an eligible evaluation
///
/// Only applied once a terminal approval exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedValues {
    pub new_past_claims_amount: Decimal,
    pub new_claim_history_count: u32,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!(PolicyStatus::parse("Expired"), PolicyStatus::Expired);
        assert_eq!(PolicyStatus::parse(" ACTIVE "), PolicyStatus::Active);
        assert_eq!(PolicyStatus::parse("current"), PolicyStatus::Active);
        assert_eq!(PolicyStatus::parse("canceled"), PolicyStatus::Cancelled);
        assert_eq!(PolicyStatus::parse(""), PolicyStatus::Unknown);
        assert_eq!(
            PolicyStatus::parse("Suspended"),
            PolicyStatus::Unrecognized("Suspended".to_string())
        );
    }

    #[test]
    fn test_status_serde_uses_labels() {
        let json = serde_json::to_string(&PolicyStatus::Terminated).unwrap();
        assert_eq!(json, "\"terminated\"");

        let parsed: PolicyStatus = serde_json::from_str("\"Lapsed\"").unwrap();
        assert_eq!(parsed, PolicyStatus::Unrecognized("Lapsed".to_string()));
    }

    #[test]
    fn test_terminal_statuses() {
        for status in ["expired", "inactive", "terminated", "cancelled"] {
            assert!(PolicyStatus::parse(status).is_terminal(), "{status}");
        }
        assert!(!PolicyStatus::Unknown.is_terminal());
        assert!(!PolicyStatus::parse("suspended").is_terminal());
    }

    #[test]
    fn test_flag_values_are_not_statuses() {
        for raw in ["0", "1", "true", "false"] {
            let status = PolicyStatus::parse(raw);
            assert_eq!(status, PolicyStatus::Unrecognized(raw.to_string()));
            assert!(!status.is_terminal());
            assert!(!status.is_active());
        }
    }

    #[test]
    fn test_empty_claim_detection() {
        assert!(ClaimFacts::default().is_empty());

        let blank = ClaimFacts {
            reason_for_claim: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.is_empty());

        let partial = ClaimFacts {
            claim_amount: Some(dec!(100)),
            ..Default::default()
        };
        assert!(!partial.is_empty());
    }

    #[test]
    fn test_snapshot_defaults_for_missing_counters() {
        let snapshot = PolicySnapshot::default();
        assert_eq!(snapshot.past_claims(), Decimal::ZERO);
        assert_eq!(snapshot.history_count(), 0);
        assert!(snapshot.expiry_date().is_none());
        assert_eq!(snapshot.policy_status, PolicyStatus::Unknown);
    }
}
