//! Decision orchestration
//!
//! Sequences one claim through the engine and records every step:
//!
//! ```text
//! workflow_initiation
//!   -> exclusion lookup (external, resolved before evaluation)
//!   -> eligibility_check
//!   -> fraud_detection          (ELIGIBLE only)
//!   -> escalation_assessment
//!   -> flagged_for_review | claim_finalized
//! ```
//!
//! Nothing is written back to the policy until a terminal decision exists:
//! either the claim finalizes automatically as ELIGIBLE, or a reviewer later
//! approves an ELIGIBLE analysis.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use core_kernel::{DecisionId, ReviewId};

use crate::audit::{actions, AgentName, AuditDispatcher, AuditEvent};
use crate::config::EngineConfig;
use crate::eligibility::{
    EligibilityEvaluator, EligibilityResult, ExclusionAssessment, ExclusionLookup,
};
use crate::error::ClaimError;
use crate::escalation::{self, EscalationPolicy, EscalationTrigger};
use crate::facts::{ClaimFacts, PolicySnapshot, UpdatedValues};
use crate::fraud::{self, FraudAssessment};
use crate::ports::{AuditSink, ExclusionClassifier, PolicyLedger, ReviewStore};
use crate::review::{AnalysisResult, ReviewDecision, ReviewQueue, ReviewRecord};

/// Fraud probability as delivered by the external model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FraudSignal {
    Scored {
        probability: f64,
        /// Falls back to the configured default when absent
        threshold: Option<f64>,
    },
    Unavailable {
        reason: String,
    },
}

/// Exclusion verdict the caller obtained before submitting the claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExclusionSignal {
    Assessed(ExclusionAssessment),
    Unavailable {
        reason: String,
    },
}

/// Everything needed to decide one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub claim: Option<ClaimFacts>,
    pub policy: Option<PolicySnapshot>,
    pub fraud: FraudSignal,
    /// Takes precedence over an injected classifier
    #[serde(default)]
    pub exclusion: Option<ExclusionSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Approved,
    Rejected,
}

/// A decision applied without human involvement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    pub decision_id: DecisionId,
    pub disposition: Disposition,
    pub eligibility: EligibilityResult,
    pub fraud: Option<FraudAssessment>,
    /// True when updated values were written to the policy ledger
    pub ledger_updated: bool,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Finalized(FinalDecision),
    Escalated(ReviewRecord),
}

impl DecisionOutcome {
    pub fn is_escalated(&self) -> bool {
        matches!(self, DecisionOutcome::Escalated(_))
    }
}

/// Composes evaluation, fraud classification, escalation and the review queue
pub struct DecisionOrchestrator {
    evaluator: EligibilityEvaluator,
    escalation: EscalationPolicy,
    default_fraud_threshold: f64,
    queue: ReviewQueue,
    audit: Arc<AuditDispatcher>,
    exclusions: Option<Arc<dyn ExclusionClassifier>>,
    ledger: Option<Arc<dyn PolicyLedger>>,
}

impl DecisionOrchestrator {
    pub fn new(config: EngineConfig, store: Arc<dyn ReviewStore>, sink: Arc<dyn AuditSink>) -> Self {
        let audit = Arc::new(AuditDispatcher::with_capacity(sink, config.audit_backlog_capacity));
        Self {
            evaluator: EligibilityEvaluator::new(config.scoring),
            escalation: EscalationPolicy::new(config.escalation),
            default_fraud_threshold: config.default_fraud_threshold,
            queue: ReviewQueue::new(store, audit.clone()),
            audit,
            exclusions: None,
            ledger: None,
        }
    }

    pub fn with_exclusion_classifier(mut self, classifier: Arc<dyn ExclusionClassifier>) -> Self {
        self.exclusions = Some(classifier);
        self
    }

    pub fn with_policy_ledger(mut self, ledger: Arc<dyn PolicyLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn queue(&self) -> &ReviewQueue {
        &self.queue
    }

    pub fn audit(&self) -> &Arc<AuditDispatcher> {
        &self.audit
    }

    /// Decides one claim, either finalizing it or parking it for review
    pub async fn process(&self, request: DecisionRequest) -> Result<DecisionOutcome, ClaimError> {
        let DecisionRequest {
            claim,
            policy,
            fraud,
            exclusion,
        } = request;
        let policy_number = claim
            .as_ref()
            .and_then(|c| c.policy_number())
            .or_else(|| policy.as_ref().and_then(|p| p.policy_number.as_deref()))
            .map(str::to_string);
        let policy_number = policy_number.as_deref();

        self.audit
            .emit(
                AuditEvent::new(AgentName::Orchestrator, policy_number, actions::WORKFLOW_INITIATION)
                    .with_inputs(json!({
                        "claim_present": claim.is_some(),
                        "policy_present": policy.is_some(),
                        "fraud_signal": fraud,
                        "exclusion_signal": exclusion,
                    })),
            )
            .await;

        let exclusion = self
            .lookup_exclusion(claim.as_ref(), policy.as_ref(), exclusion)
            .await;
        let eligibility = self.evaluator.evaluate(claim.as_ref(), policy.as_ref(), &exclusion);
        self.audit
            .emit(eligibility_event(policy_number, claim.as_ref(), policy.as_ref(), &eligibility))
            .await;

        let mut triggers = Vec::new();
        let mut fraud_assessment = None;
        if eligibility.is_error() {
            triggers.push(EscalationTrigger::EvaluationError);
        } else if eligibility.is_eligible() {
            match self.score_fraud(fraud) {
                Ok(assessment) => {
                    self.audit
                        .emit(
                            AuditEvent::new(AgentName::FraudDetection, policy_number, actions::FRAUD_DETECTION)
                                .with_inputs(json!({
                                    "fraud_probability": assessment.fraud_probability,
                                    "threshold": assessment.threshold_used,
                                }))
                                .with_outputs(json!({
                                    "fraud_prediction": assessment.fraud_prediction,
                                    "risk_level": assessment.risk_level,
                                    "recommendation": assessment.recommendation(),
                                }))
                                .with_decision(assessment.risk_level.label()),
                        )
                        .await;
                    fraud_assessment = Some(assessment);
                }
                Err(reason) => {
                    warn!(policy_number = policy_number.unwrap_or("UNKNOWN"), %reason, "Fraud score unavailable");
                    self.audit
                        .emit(
                            AuditEvent::new(AgentName::FraudDetection, policy_number, actions::FRAUD_DETECTION)
                                .with_outputs(json!({"status": "unavailable", "reason": reason}))
                                .with_decision("UNKNOWN"),
                        )
                        .await;
                    triggers.push(EscalationTrigger::FraudScoreUnavailable { reason });
                }
            }
        }

        let fraud_flag = fraud_assessment.map_or(false, |a| a.is_fraud());
        triggers.extend(self.escalation.assess(
            eligibility.confidence_score,
            &eligibility.checks_failed,
            fraud_flag,
        ));
        let needs_review = !triggers.is_empty();
        self.audit
            .emit(
                AuditEvent::new(AgentName::HumanReview, policy_number, actions::ESCALATION_ASSESSMENT)
                    .with_inputs(json!({
                        "confidence_score": eligibility.confidence_score,
                        "checks_failed": eligibility.checks_failed,
                        "fraud_flag": fraud_flag,
                    }))
                    .with_outputs(json!({
                        "needs_review": needs_review,
                        "triggers": triggers,
                    }))
                    .with_decision(if needs_review { "ESCALATE" } else { "AUTO" }),
            )
            .await;

        if needs_review {
            let reason = escalation::describe(&triggers);
            let analysis = AnalysisResult {
                eligibility,
                fraud: fraud_assessment,
                triggers,
                policy,
            };
            let record = self
                .queue
                .enqueue(claim.unwrap_or_default(), analysis, reason)
                .await?;
            return Ok(DecisionOutcome::Escalated(record));
        }

        let disposition = if eligibility.is_eligible() {
            Disposition::Approved
        } else {
            Disposition::Rejected
        };
        let ledger_updated = match (disposition, eligibility.updated_values.as_ref()) {
            (Disposition::Approved, Some(values)) => self.apply_usage(policy_number, values).await?,
            _ => false,
        };

        let decision = FinalDecision {
            decision_id: DecisionId::new(),
            disposition,
            eligibility,
            fraud: fraud_assessment,
            ledger_updated,
            decided_at: Utc::now(),
        };
        info!(
            decision_id = %decision.decision_id,
            policy_number = policy_number.unwrap_or("UNKNOWN"),
            disposition = ?decision.disposition,
            confidence = decision.eligibility.confidence_score,
            "Claim finalized"
        );
        self.audit
            .emit(
                AuditEvent::new(AgentName::Orchestrator, policy_number, actions::CLAIM_FINALIZED)
                    .with_outputs(json!({
                        "decision_id": decision.decision_id,
                        "eligibility_decision": decision.eligibility.decision,
                        "risk_level": decision.fraud.map(|f| f.risk_level),
                        "ledger_updated": decision.ledger_updated,
                    }))
                    .with_decision(match decision.disposition {
                        Disposition::Approved => "APPROVED",
                        Disposition::Rejected => "REJECTED",
                    }),
            )
            .await;

        Ok(DecisionOutcome::Finalized(decision))
    }

    /// Resolves a review and applies approved usage to the policy
    ///
    /// The resolution is terminal once stored, so a ledger failure afterwards
    /// is logged rather than returned.
    pub async fn resolve_review(
        &self,
        review_id: ReviewId,
        decision: ReviewDecision,
        reviewer_name: &str,
        notes: &str,
    ) -> Result<ReviewRecord, ClaimError> {
        let record = self
            .queue
            .resolve(review_id, decision, reviewer_name, notes)
            .await?;

        if decision == ReviewDecision::Approve && record.analysis_result.eligibility.is_eligible() {
            if let Some(values) = record.analysis_result.eligibility.updated_values {
                if let Err(err) = self.apply_usage(record.policy_number(), &values).await {
                    warn!(review_id = %review_id, error = %err, "Approved review not applied to policy ledger");
                }
            }
        }

        Ok(record)
    }

    async fn lookup_exclusion(
        &self,
        claim: Option<&ClaimFacts>,
        policy: Option<&PolicySnapshot>,
        supplied: Option<ExclusionSignal>,
    ) -> ExclusionLookup {
        if let Some(signal) = supplied {
            return match signal {
                ExclusionSignal::Assessed(assessment) => checked_exclusion(assessment),
                ExclusionSignal::Unavailable { reason } => ExclusionLookup::Unavailable(reason),
            };
        }

        let Some(classifier) = &self.exclusions else {
            return ExclusionLookup::NotApplicable;
        };
        let (Some(reason), Some(exclusions)) = (
            claim.and_then(ClaimFacts::reason),
            policy.and_then(PolicySnapshot::exclusions),
        ) else {
            return ExclusionLookup::NotApplicable;
        };

        match classifier.classify(reason, exclusions).await {
            Ok(assessment) => checked_exclusion(assessment),
            Err(err) => {
                let err = ClaimError::unavailable("exclusion-classifier", err.to_string());
                warn!(error = %err, "Exclusion check degraded");
                ExclusionLookup::Unavailable(err.to_string())
            }
        }
    }

    fn score_fraud(&self, signal: FraudSignal) -> Result<FraudAssessment, String> {
        match signal {
            FraudSignal::Unavailable { reason } => Err(reason),
            FraudSignal::Scored { probability, threshold } => {
                let threshold = threshold.unwrap_or(self.default_fraud_threshold);
                let probability = fraud::validate_probability(probability).map_err(|e| e.to_string())?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(format!("Invalid fraud threshold: {}", threshold));
                }
                Ok(fraud::classify(probability, threshold))
            }
        }
    }

    /// Returns whether the ledger was written
    async fn apply_usage(
        &self,
        policy_number: Option<&str>,
        values: &UpdatedValues,
    ) -> Result<bool, ClaimError> {
        let Some(ledger) = &self.ledger else {
            return Ok(false);
        };
        let Some(policy_number) = policy_number else {
            warn!("Approved claim has no policy number, ledger not updated");
            return Ok(false);
        };
        ledger.apply_claim_usage(policy_number, values).await?;
        info!(
            policy_number,
            new_past_claims_amount = %values.new_past_claims_amount,
            new_claim_history_count = values.new_claim_history_count,
            "Policy ledger updated"
        );
        Ok(true)
    }
}

/// A verdict whose confidence is outside 0-100 is not trusted
fn checked_exclusion(assessment: ExclusionAssessment) -> ExclusionLookup {
    if assessment.confidence.is_finite() && (0.0..=100.0).contains(&assessment.confidence) {
        ExclusionLookup::Assessed(assessment)
    } else {
        warn!(confidence = assessment.confidence, "Exclusion verdict rejected");
        ExclusionLookup::Unavailable(format!(
            "Invalid exclusion confidence: {}",
            assessment.confidence
        ))
    }
}

fn eligibility_event(
    policy_number: Option<&str>,
    claim: Option<&ClaimFacts>,
    policy: Option<&PolicySnapshot>,
    result: &EligibilityResult,
) -> AuditEvent {
    AuditEvent::new(AgentName::Eligibility, policy_number, actions::ELIGIBILITY_CHECK)
        .with_inputs(json!({
            "claim_amount": claim.and_then(|c| c.claim_amount),
            "claim_date": claim.and_then(|c| c.claim_date.clone()),
            "policy_status": policy.map(|p| p.policy_status.clone()),
            "coverage_limit": policy.and_then(|p| p.policy_limit),
            "expiry_date": policy.and_then(|p| p.policy_expiry_date.clone()),
        }))
        .with_outputs(json!({
            "eligibility_status": result.decision,
            "checks_failed": result.checks_failed,
            "ambiguity_factors": result.ambiguity_factors,
            "reasoning": result.reasoning,
        }))
        .with_decision(result.decision.as_str())
        .with_metadata(json!({
            "confidence_score": result.confidence_score,
            "ambiguity_score": result.ambiguity_score,
            "checks_performed": result.check_trail,
        }))
}
