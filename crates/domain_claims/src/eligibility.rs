//! Eligibility evaluation
//!
//! Checks run in a fixed order and are folded left to right. Each check is a
//! pure function of the inputs that returns a verdict plus any ambiguity it
//! observed; nothing is shared between checks except through the fold.
//!
//! ```text
//! completeness -> limit -> status -> frequency -> temporal -> exclusion
//!                   │        │          │            │
//!                   └────────┴──────────┴────────────┴──> short-circuit reject
//! ```
//!
//! A short-circuit rejection carries the check's fixed confidence. Failures
//! that do not short-circuit (exclusion match, unrecognised status label) are
//! collected and turned into a NOT_ELIGIBLE whose confidence falls as the
//! accumulated ambiguity rises.

use std::fmt;
use std::ops::ControlFlow;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use core_kernel::parse_date_pair;

use crate::config::ScoringConfig;
use crate::error::ClaimError;
use crate::facts::{ClaimFacts, PolicySnapshot, PolicyStatus, UpdatedValues};

/// Failed-check labels
///
/// These strings are persisted in review records and audit events, so they
/// must never change.
pub mod labels {
    pub const LIMIT_EXCEEDED: &str = "Claim amount exceeded available limit";
    pub const POLICY_NOT_ACTIVE: &str = "Policy is not active";
    pub const MAX_CLAIMS_EXCEEDED: &str = "Maximum claim count exceeded";
    pub const CLAIM_AFTER_EXPIRY: &str = "Claim date after policy expiry";
    pub const EXCLUSION_MATCH: &str = "Claim reason matches policy exclusion";
}

/// Outcome of an eligibility evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityDecision {
    Eligible,
    NotEligible,
    Error,
}

impl EligibilityDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            EligibilityDecision::Eligible => "ELIGIBLE",
            EligibilityDecision::NotEligible => "NOT_ELIGIBLE",
            EligibilityDecision::Error => "ERROR",
        }
    }
}

impl fmt::Display for EligibilityDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individual checks in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Completeness,
    Limit,
    Status,
    Frequency,
    Temporal,
    Exclusion,
}

/// How a single check ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Skipped,
    /// Recorded a failure but let evaluation continue
    Failed,
    /// Ended evaluation
    Rejected,
}

/// One entry of the reasoning trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckNote {
    pub check: CheckKind,
    pub status: CheckStatus,
    pub detail: String,
}

/// Verdict of the external exclusion-text classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionAssessment {
    pub is_excluded: bool,
    /// Classifier's own confidence, 0-100
    pub confidence: f64,
    pub matched_exclusion: Option<String>,
    #[serde(default)]
    pub reasoning: String,
}

/// What the orchestrator learned from the exclusion classifier
#[derive(Debug, Clone, PartialEq)]
pub enum ExclusionLookup {
    Assessed(ExclusionAssessment),
    /// Classifier was asked but could not answer
    Unavailable(String),
    /// Classifier was not consulted
    NotApplicable,
}

/// Result of evaluating one claim against one policy snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub decision: EligibilityDecision,
    pub confidence_score: f64,
    pub ambiguity_score: f64,
    pub ambiguity_factors: Vec<String>,
    pub checks_failed: Vec<String>,
    pub reasoning: String,
    pub check_trail: Vec<CheckNote>,
    /// Proposed counters; present only when ELIGIBLE
    pub updated_values: Option<UpdatedValues>,
    pub exclusion_summary: Option<String>,
}

impl EligibilityResult {
    /// Result for a run whose claim or policy data never arrived
    pub fn error(reasoning: impl Into<String>) -> Self {
        Self {
            decision: EligibilityDecision::Error,
            confidence_score: 0.0,
            ambiguity_score: 0.0,
            ambiguity_factors: Vec::new(),
            checks_failed: Vec::new(),
            reasoning: reasoning.into(),
            check_trail: Vec::new(),
            updated_values: None,
            exclusion_summary: None,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.decision == EligibilityDecision::Eligible
    }

    pub fn is_error(&self) -> bool {
        self.decision == EligibilityDecision::Error
    }
}

/// Runs the eligibility pipeline
#[derive(Debug, Clone, Default)]
pub struct EligibilityEvaluator {
    config: ScoringConfig,
}

impl EligibilityEvaluator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Evaluates a claim against a policy snapshot
    ///
    /// Never fails: absent inputs produce an ERROR result and malformed
    /// optional fields raise the ambiguity score.
    pub fn evaluate(
        &self,
        claim: Option<&ClaimFacts>,
        policy: Option<&PolicySnapshot>,
        exclusion: &ExclusionLookup,
    ) -> EligibilityResult {
        let (claim, policy) = match require_inputs(claim, policy) {
            Ok(inputs) => inputs,
            Err(err) => {
                warn!(error = %err, "Eligibility evaluation aborted");
                return EligibilityResult::error(err.to_string());
            }
        };

        let inputs = Inputs {
            claim,
            policy,
            exclusion,
            config: &self.config,
        };

        let result = match PIPELINE
            .iter()
            .try_fold(Tally::default(), |tally, check| tally.absorb(check(&inputs)))
        {
            ControlFlow::Break(rejected) => rejected,
            ControlFlow::Continue(tally) => tally.finish(&inputs),
        };

        info!(
            policy_number = claim.policy_number().unwrap_or("UNKNOWN"),
            decision = %result.decision,
            confidence = result.confidence_score,
            ambiguity = result.ambiguity_score,
            "Eligibility evaluated"
        );
        result
    }
}

fn require_inputs<'a>(
    claim: Option<&'a ClaimFacts>,
    policy: Option<&'a PolicySnapshot>,
) -> Result<(&'a ClaimFacts, &'a PolicySnapshot), ClaimError> {
    let claim = claim.filter(|c| !c.is_empty());
    match (claim, policy) {
        (Some(claim), Some(policy)) => Ok((claim, policy)),
        (None, Some(_)) => Err(ClaimError::InputMissing("claim information".to_string())),
        (Some(_), None) => Err(ClaimError::InputMissing("policy information".to_string())),
        (None, None) => Err(ClaimError::InputMissing(
            "policy and claim information".to_string(),
        )),
    }
}

struct Inputs<'a> {
    claim: &'a ClaimFacts,
    policy: &'a PolicySnapshot,
    exclusion: &'a ExclusionLookup,
    config: &'a ScoringConfig,
}

impl Inputs<'_> {
    fn claim_amount(&self) -> Decimal {
        self.claim.claim_amount.unwrap_or(Decimal::ZERO)
    }
}

struct AmbiguityFactor {
    weight: f64,
    reason: String,
}

enum Verdict {
    Pass,
    Skip,
    Fail(&'static str),
    Reject {
        label: &'static str,
        confidence: f64,
        reasoning: String,
    },
}

struct CheckOutcome {
    kind: CheckKind,
    verdict: Verdict,
    ambiguity: Vec<AmbiguityFactor>,
    detail: String,
    exclusion_summary: Option<String>,
}

impl CheckOutcome {
    fn new(kind: CheckKind, verdict: Verdict, detail: impl Into<String>) -> Self {
        Self {
            kind,
            verdict,
            ambiguity: Vec::new(),
            detail: detail.into(),
            exclusion_summary: None,
        }
    }

    fn with_ambiguity(mut self, weight: f64, reason: impl Into<String>) -> Self {
        self.ambiguity.push(AmbiguityFactor {
            weight,
            reason: reason.into(),
        });
        self
    }

    fn with_summary(mut self, summary: String) -> Self {
        self.exclusion_summary = Some(summary);
        self
    }
}

type Check = fn(&Inputs<'_>) -> CheckOutcome;

const PIPELINE: [Check; 6] = [
    completeness_scan,
    limit_check,
    status_check,
    frequency_check,
    temporal_check,
    exclusion_check,
];

#[derive(Default)]
struct Tally {
    ambiguity_score: f64,
    ambiguity_factors: Vec<String>,
    checks_failed: Vec<String>,
    trail: Vec<CheckNote>,
    exclusion_summary: Option<String>,
}

impl Tally {
    fn absorb(mut self, outcome: CheckOutcome) -> ControlFlow<EligibilityResult, Self> {
        for factor in outcome.ambiguity {
            self.ambiguity_score += factor.weight;
            self.ambiguity_factors.push(factor.reason);
        }
        if outcome.exclusion_summary.is_some() {
            self.exclusion_summary = outcome.exclusion_summary;
        }

        let status = match &outcome.verdict {
            Verdict::Pass => CheckStatus::Passed,
            Verdict::Skip => CheckStatus::Skipped,
            Verdict::Fail(_) => CheckStatus::Failed,
            Verdict::Reject { .. } => CheckStatus::Rejected,
        };
        debug!(check = ?outcome.kind, ?status, detail = %outcome.detail, "Eligibility check");
        self.trail.push(CheckNote {
            check: outcome.kind,
            status,
            detail: outcome.detail,
        });

        match outcome.verdict {
            Verdict::Pass | Verdict::Skip => ControlFlow::Continue(self),
            Verdict::Fail(label) => {
                self.checks_failed.push(label.to_string());
                ControlFlow::Continue(self)
            }
            Verdict::Reject {
                label,
                confidence,
                reasoning,
            } => {
                self.checks_failed.push(label.to_string());
                ControlFlow::Break(EligibilityResult {
                    decision: EligibilityDecision::NotEligible,
                    confidence_score: confidence,
                    ambiguity_score: self.ambiguity_score,
                    ambiguity_factors: self.ambiguity_factors,
                    checks_failed: self.checks_failed,
                    reasoning,
                    check_trail: self.trail,
                    updated_values: None,
                    exclusion_summary: None,
                })
            }
        }
    }

    fn finish(self, inputs: &Inputs<'_>) -> EligibilityResult {
        let config = inputs.config;
        let ambiguity = self.ambiguity_score;

        if self.checks_failed.is_empty() {
            let reasoning = if ambiguity > 0.0 {
                format!(
                    "All eligibility checks passed. However, {} ambiguity factor(s) detected, reducing confidence.",
                    self.ambiguity_factors.len()
                )
            } else {
                "All eligibility checks passed. Claim is approved for processing.".to_string()
            };
            let updated_values = UpdatedValues {
                new_past_claims_amount: inputs.policy.past_claims() + inputs.claim_amount(),
                new_claim_history_count: inputs.policy.history_count() + 1,
            };
            return EligibilityResult {
                decision: EligibilityDecision::Eligible,
                confidence_score: config.eligible_confidence(ambiguity),
                ambiguity_score: ambiguity,
                ambiguity_factors: self.ambiguity_factors,
                checks_failed: self.checks_failed,
                reasoning,
                check_trail: self.trail,
                updated_values: Some(updated_values),
                exclusion_summary: self.exclusion_summary,
            };
        }

        let failed = self.checks_failed.len();
        let reasoning = if ambiguity >= config.high_ambiguity {
            format!(
                "Claim failed {} check(s), but high ambiguity detected. Human review strongly recommended.",
                failed
            )
        } else if ambiguity >= config.medium_ambiguity {
            format!("Claim failed {} check(s) with some ambiguity. Consider human review.", failed)
        } else {
            format!("Claim failed {} eligibility check(s) with clear reasons.", failed)
        };

        EligibilityResult {
            decision: EligibilityDecision::NotEligible,
            confidence_score: config.tiered_rejection_confidence(ambiguity),
            ambiguity_score: ambiguity,
            ambiguity_factors: self.ambiguity_factors,
            checks_failed: self.checks_failed,
            reasoning,
            check_trail: self.trail,
            updated_values: None,
            exclusion_summary: self.exclusion_summary,
        }
    }
}

fn completeness_scan(inputs: &Inputs<'_>) -> CheckOutcome {
    let Inputs { claim, policy, config, .. } = inputs;
    let mut gaps: Vec<(f64, &str)> = Vec::new();

    if claim.claim_amount.map_or(true, |amount| amount.is_zero()) {
        gaps.push((config.missing_amount_weight, "Missing or zero claim amount"));
    }
    if claim
        .reason()
        .map_or(true, |reason| reason.chars().count() < config.min_reason_chars)
    {
        gaps.push((config.short_reason_weight, "Missing or insufficient claim reason"));
    }
    if policy.policy_status.is_unknown() {
        gaps.push((config.unknown_status_weight, "Policy status unclear or missing"));
    }
    if policy.expiry_date().is_none() {
        gaps.push((config.missing_expiry_weight, "Policy expiry date missing"));
    }
    if claim.claim_date().is_none() {
        gaps.push((config.missing_claim_date_weight, "Claim date missing"));
    }
    if policy.policy_limit.map_or(true, |limit| limit.is_zero()) {
        gaps.push((config.missing_limit_weight, "Policy limit data unavailable"));
    }

    let detail = if gaps.is_empty() {
        "All scored fields present".to_string()
    } else {
        format!("{} data gap(s) found", gaps.len())
    };
    gaps.into_iter().fold(
        CheckOutcome::new(CheckKind::Completeness, Verdict::Pass, detail),
        |outcome, (weight, reason)| outcome.with_ambiguity(weight, reason),
    )
}

fn limit_check(inputs: &Inputs<'_>) -> CheckOutcome {
    let Some(limit) = inputs.policy.policy_limit else {
        return CheckOutcome::new(
            CheckKind::Limit,
            Verdict::Skip,
            "Policy limit unavailable, limit check skipped",
        );
    };
    let config = inputs.config;
    let claim_amount = inputs.claim_amount();
    let available = (limit - inputs.policy.past_claims()).max(Decimal::ZERO);

    let mut borderline = None;
    if claim_amount > Decimal::ZERO && available > Decimal::ZERO {
        let utilisation = (claim_amount / available * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(f64::MAX);
        if (config.borderline_low_pct..=config.borderline_high_pct).contains(&utilisation) {
            borderline = Some(utilisation);
        }
    }

    let outcome = if claim_amount > available {
        CheckOutcome::new(
            CheckKind::Limit,
            Verdict::Reject {
                label: labels::LIMIT_EXCEEDED,
                confidence: config.limit_reject_confidence,
                reasoning: format!(
                    "Claim amount {:.2} exceeds available policy limit {:.2}",
                    claim_amount, available
                ),
            },
            format!(
                "Limit {:.2}, past claims {:.2}, available {:.2}",
                limit,
                inputs.policy.past_claims(),
                available
            ),
        )
    } else {
        CheckOutcome::new(
            CheckKind::Limit,
            Verdict::Pass,
            format!(
                "Claim amount {:.2} is within the available policy limit {:.2}",
                claim_amount, available
            ),
        )
    };

    match borderline {
        Some(pct) => outcome.with_ambiguity(
            config.borderline_weight,
            format!("Claim amount borderline ({:.1}% of available limit)", pct),
        ),
        None => outcome,
    }
}

fn status_check(inputs: &Inputs<'_>) -> CheckOutcome {
    let status = &inputs.policy.policy_status;
    match status {
        PolicyStatus::Active => CheckOutcome::new(
            CheckKind::Status,
            Verdict::Pass,
            format!("Policy status is '{}' and valid for claims", status),
        ),
        PolicyStatus::Unknown => CheckOutcome::new(
            CheckKind::Status,
            Verdict::Skip,
            "Policy status unknown, not treated as a rejection",
        ),
        s if s.is_terminal() => CheckOutcome::new(
            CheckKind::Status,
            Verdict::Reject {
                label: labels::POLICY_NOT_ACTIVE,
                confidence: inputs.config.status_reject_confidence,
                reasoning: format!(
                    "Policy status is '{}' - expired or inactive policies are not eligible for claims",
                    s
                ),
            },
            format!("Policy status is '{}'", s),
        ),
        other => CheckOutcome::new(
            CheckKind::Status,
            Verdict::Fail(labels::POLICY_NOT_ACTIVE),
            format!("Policy status is '{}'. Only active policies are eligible for claims", other),
        ),
    }
}

fn frequency_check(inputs: &Inputs<'_>) -> CheckOutcome {
    let count = inputs.policy.history_count();
    let max = inputs.config.max_claim_count;
    if count >= max {
        CheckOutcome::new(
            CheckKind::Frequency,
            Verdict::Reject {
                label: labels::MAX_CLAIMS_EXCEEDED,
                confidence: inputs.config.frequency_reject_confidence,
                reasoning: format!(
                    "Policy has reached maximum claim count ({} claims, limit is {})",
                    count, max
                ),
            },
            format!("Claim count is {}, maximum allowed is {}", count, max),
        )
    } else {
        CheckOutcome::new(
            CheckKind::Frequency,
            Verdict::Pass,
            format!("Claim count of {} is within the allowed limit", count),
        )
    }
}

fn temporal_check(inputs: &Inputs<'_>) -> CheckOutcome {
    let (Some(claim_date), Some(expiry)) = (inputs.claim.claim_date(), inputs.policy.expiry_date())
    else {
        return CheckOutcome::new(
            CheckKind::Temporal,
            Verdict::Skip,
            "Missing date information",
        );
    };

    match parse_date_pair(claim_date, expiry) {
        None => CheckOutcome::new(
            CheckKind::Temporal,
            Verdict::Skip,
            format!("Could not validate dates. Claim: {}, Expiry: {}", claim_date, expiry),
        )
        .with_ambiguity(
            inputs.config.unparseable_dates_weight,
            "Unable to parse claim or policy dates - format ambiguous",
        ),
        Some(pair) if pair.first_is_after_second() => CheckOutcome::new(
            CheckKind::Temporal,
            Verdict::Reject {
                label: labels::CLAIM_AFTER_EXPIRY,
                confidence: inputs.config.date_reject_confidence,
                reasoning: format!(
                    "Claim date ({}) is after policy expiry date ({})",
                    claim_date, expiry
                ),
            },
            format!("Dates compared under {}", pair.format),
        ),
        Some(pair) => CheckOutcome::new(
            CheckKind::Temporal,
            Verdict::Pass,
            format!(
                "Claim date ({}) is not after the policy expiry date ({}), compared under {}",
                claim_date, expiry, pair.format
            ),
        ),
    }
}

fn exclusion_check(inputs: &Inputs<'_>) -> CheckOutcome {
    if inputs.claim.reason().is_none() || inputs.policy.exclusions().is_none() {
        return CheckOutcome::new(
            CheckKind::Exclusion,
            Verdict::Skip,
            "Missing claim reason or exclusions data",
        );
    }

    match inputs.exclusion {
        ExclusionLookup::NotApplicable => CheckOutcome::new(
            CheckKind::Exclusion,
            Verdict::Skip,
            "No exclusion verdict supplied",
        ),
        ExclusionLookup::Unavailable(reason) => CheckOutcome::new(
            CheckKind::Exclusion,
            Verdict::Skip,
            format!("Exclusion classifier unavailable: {}", reason),
        )
        .with_ambiguity(
            inputs.config.exclusion_unavailable_weight,
            "Exclusion analysis unavailable",
        ),
        ExclusionLookup::Assessed(assessment) => {
            let outcome = if assessment.is_excluded {
                let matched = assessment
                    .matched_exclusion
                    .as_deref()
                    .unwrap_or("Not specified");
                CheckOutcome::new(
                    CheckKind::Exclusion,
                    Verdict::Fail(labels::EXCLUSION_MATCH),
                    format!("Matched exclusion: {}", matched),
                )
                .with_summary(format!("Excluded: {}. {}", matched, assessment.reasoning))
            } else {
                CheckOutcome::new(
                    CheckKind::Exclusion,
                    Verdict::Pass,
                    "Claim reason does not match any policy exclusion",
                )
                .with_summary(format!("Not excluded. {}", assessment.reasoning))
            };

            let extra = inputs.config.exclusion_ambiguity(assessment.confidence);
            if extra > 0.0 {
                outcome.with_ambiguity(
                    extra,
                    format!(
                        "Exclusion analysis has low confidence ({}%)",
                        assessment.confidence
                    ),
                )
            } else {
                outcome
            }
        }
    }
}
