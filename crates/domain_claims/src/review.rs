//! Human review queue
//!
//! Claims the engine will not decide on its own wait here for a reviewer.
//! Each record moves through exactly one transition:
//!
//! ```text
//! pending ──resolve(APPROVE | REJECT)──> reviewed
//! ```
//!
//! There is no reopen. A second resolution of the same review fails with
//! `AlreadyResolved` and leaves the first reviewer's decision untouched.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use core_kernel::{CoreError, ReviewId};

use crate::audit::{actions, AgentName, AuditDispatcher, AuditEvent};
use crate::eligibility::{EligibilityDecision, EligibilityResult};
use crate::error::ClaimError;
use crate::escalation::EscalationTrigger;
use crate::facts::{ClaimFacts, PolicySnapshot};
use crate::fraud::FraudAssessment;
use crate::ports::ReviewStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Reviewed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Reviewed => "reviewed",
        }
    }
}

/// A reviewer's terminal decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approve => "APPROVE",
            ReviewDecision::Reject => "REJECT",
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewDecision {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "APPROVE" => Ok(ReviewDecision::Approve),
            "REJECT" => Ok(ReviewDecision::Reject),
            other => Err(CoreError::validation(format!(
                "decision must be APPROVE or REJECT, got '{}'",
                other
            ))),
        }
    }
}

/// Everything the engine knew when it escalated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub eligibility: EligibilityResult,
    pub fraud: Option<FraudAssessment>,
    #[serde(default)]
    pub triggers: Vec<EscalationTrigger>,
    #[serde(default)]
    pub policy: Option<PolicySnapshot>,
}

/// Reviewer input applied by a resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub decision: ReviewDecision,
    pub reviewer_name: String,
    pub reviewer_notes: String,
    pub resolved_at: DateTime<Utc>,
}

/// A claim awaiting or having received a human decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub review_id: ReviewId,
    pub status: ReviewStatus,
    pub claim_data: ClaimFacts,
    pub analysis_result: AnalysisResult,
    pub flag_reason: String,
    pub confidence_score: f64,
    pub reviewer_name: Option<String>,
    pub reviewer_notes: Option<String>,
    pub final_decision: Option<ReviewDecision>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ReviewRecord {
    /// Creates a pending record with a fresh time-ordered id
    pub fn new(claim_data: ClaimFacts, analysis_result: AnalysisResult, flag_reason: impl Into<String>) -> Self {
        Self {
            review_id: ReviewId::new(),
            status: ReviewStatus::Pending,
            confidence_score: analysis_result.eligibility.confidence_score,
            claim_data,
            analysis_result,
            flag_reason: flag_reason.into(),
            reviewer_name: None,
            reviewer_notes: None,
            final_decision: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReviewStatus::Pending
    }

    /// The machine decision the reviewer is asked to confirm or override
    pub fn ai_recommendation(&self) -> EligibilityDecision {
        self.analysis_result.eligibility.decision
    }

    /// Policy number from the claim, falling back to the policy snapshot
    pub fn policy_number(&self) -> Option<&str> {
        self.claim_data.policy_number().or_else(|| {
            self.analysis_result
                .policy
                .as_ref()
                .and_then(|p| p.policy_number.as_deref())
                .map(str::trim)
                .filter(|p| !p.is_empty())
        })
    }

    /// True when the human decision disagrees with the machine
    pub fn is_override(&self) -> bool {
        match self.final_decision {
            Some(ReviewDecision::Approve) => !self.analysis_result.eligibility.is_eligible(),
            Some(ReviewDecision::Reject) => self.analysis_result.eligibility.is_eligible(),
            None => false,
        }
    }

    /// Applies the single pending -> reviewed transition
    pub fn apply_resolution(&mut self, resolution: &Resolution) -> Result<(), CoreError> {
        if !self.is_pending() {
            return Err(CoreError::invalid_state(format!(
                "review {} is already {}",
                self.review_id,
                self.status.as_str()
            )));
        }
        self.status = ReviewStatus::Reviewed;
        self.final_decision = Some(resolution.decision);
        self.reviewer_name = Some(resolution.reviewer_name.clone());
        self.reviewer_notes = Some(resolution.reviewer_notes.clone());
        self.resolved_at = Some(resolution.resolved_at);
        Ok(())
    }
}

/// Queue counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewStatistics {
    pub total_reviews: usize,
    pub pending: usize,
    pub reviewed: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Mean machine confidence across all records, 0 when empty
    pub avg_confidence: f64,
}

impl ReviewStatistics {
    pub fn from_records(records: &[ReviewRecord]) -> Self {
        let mut stats = records.iter().fold(Self::default(), |mut stats, record| {
            stats.total_reviews += 1;
            match record.status {
                ReviewStatus::Pending => stats.pending += 1,
                ReviewStatus::Reviewed => stats.reviewed += 1,
            }
            match record.final_decision {
                Some(ReviewDecision::Approve) => stats.approved += 1,
                Some(ReviewDecision::Reject) => stats.rejected += 1,
                None => {}
            }
            stats.avg_confidence += record.confidence_score;
            stats
        });
        if stats.total_reviews > 0 {
            stats.avg_confidence /= stats.total_reviews as f64;
        }
        stats
    }
}

/// Queue operations over an injected store
#[derive(Clone)]
pub struct ReviewQueue {
    store: Arc<dyn ReviewStore>,
    audit: Arc<AuditDispatcher>,
}

impl ReviewQueue {
    pub fn new(store: Arc<dyn ReviewStore>, audit: Arc<AuditDispatcher>) -> Self {
        Self { store, audit }
    }

    pub fn store(&self) -> &Arc<dyn ReviewStore> {
        &self.store
    }

    /// Durably adds a claim to the queue
    pub async fn enqueue(
        &self,
        claim_data: ClaimFacts,
        analysis_result: AnalysisResult,
        reason: impl Into<String>,
    ) -> Result<ReviewRecord, ClaimError> {
        let record = ReviewRecord::new(claim_data, analysis_result, reason);
        self.store.append(&record).await?;

        info!(
            review_id = %record.review_id,
            policy_number = record.policy_number().unwrap_or("UNKNOWN"),
            confidence = record.confidence_score,
            reason = %record.flag_reason,
            "Claim flagged for human review"
        );
        self.audit
            .emit(
                AuditEvent::new(AgentName::HumanReview, record.policy_number(), actions::FLAGGED_FOR_REVIEW)
                    .with_inputs(json!({
                        "ai_recommendation": record.ai_recommendation(),
                        "ai_confidence": record.confidence_score,
                    }))
                    .with_outputs(json!({
                        "review_id": record.review_id,
                        "status": record.status,
                        "flag_reason": record.flag_reason,
                    }))
                    .with_decision(record.status.as_str()),
            )
            .await;

        Ok(record)
    }

    /// Pending records in insertion order
    pub async fn list_pending(&self) -> Result<Vec<ReviewRecord>, ClaimError> {
        Ok(self.store.pending().await?)
    }

    pub async fn get(&self, review_id: ReviewId) -> Result<ReviewRecord, ClaimError> {
        self.store
            .get(review_id)
            .await
            .map_err(|e| ClaimError::from_store(review_id, e))
    }

    /// Records a reviewer's decision
    ///
    /// # Errors
    ///
    /// `ReviewNotFound` for unknown ids, `AlreadyResolved` when the record was
    /// already reviewed, `Validation` for a blank reviewer name or notes.
    pub async fn resolve(
        &self,
        review_id: ReviewId,
        decision: ReviewDecision,
        reviewer_name: &str,
        notes: &str,
    ) -> Result<ReviewRecord, ClaimError> {
        let reviewer_name = reviewer_name.trim();
        let notes = notes.trim();
        if reviewer_name.is_empty() {
            return Err(ClaimError::validation("reviewer name must not be blank"));
        }
        if notes.is_empty() {
            return Err(ClaimError::validation("review notes must not be blank"));
        }

        let resolution = Resolution {
            decision,
            reviewer_name: reviewer_name.to_string(),
            reviewer_notes: notes.to_string(),
            resolved_at: Utc::now(),
        };
        let record = self
            .store
            .resolve(review_id, &resolution)
            .await
            .map_err(|e| ClaimError::from_store(review_id, e))?;

        info!(
            review_id = %review_id,
            decision = %decision,
            reviewer = reviewer_name,
            ai_recommendation = %record.ai_recommendation(),
            "Review resolved"
        );
        self.audit.emit(resolution_event(&record)).await;

        Ok(record)
    }

    /// Archived resolutions
    pub async fn history(&self) -> Result<Vec<ReviewRecord>, ClaimError> {
        Ok(self.store.history().await?)
    }

    pub async fn statistics(&self) -> Result<ReviewStatistics, ClaimError> {
        let records = self.store.all().await?;
        Ok(ReviewStatistics::from_records(&records))
    }
}

/// Audit event placing the machine recommendation beside the human decision
fn resolution_event(record: &ReviewRecord) -> AuditEvent {
    let decision = record
        .final_decision
        .map(|d| d.as_str())
        .unwrap_or_default();
    AuditEvent::new(
        AgentName::HumanReview,
        record.policy_number(),
        actions::MANUAL_REVIEW_DECISION,
    )
    .with_inputs(json!({
        "ai_recommendation": record.ai_recommendation(),
        "ai_confidence": record.confidence_score,
        "reason_for_review": record.flag_reason,
        "claim_details": record.claim_data,
    }))
    .with_outputs(json!({
        "final_decision": decision,
        "reasoning": record.reviewer_notes,
        "review_date": record.resolved_at,
    }))
    .with_decision(decision)
    .with_metadata(json!({
        "review_id": record.review_id,
        "reviewer_name": record.reviewer_name,
        "review_notes": record.reviewer_notes,
        "original_ai_confidence": record.confidence_score,
        "human_override": record.is_override(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::{InMemoryAuditSink, InMemoryReviewStore};
    use rust_decimal_macros::dec;

    fn analysis(decision: EligibilityDecision, confidence: f64) -> AnalysisResult {
        let mut eligibility = EligibilityResult::error("placeholder");
        eligibility.decision = decision;
        eligibility.confidence_score = confidence;
        AnalysisResult {
            eligibility,
            fraud: None,
            triggers: vec![],
            policy: None,
        }
    }

    fn claim() -> ClaimFacts {
        ClaimFacts {
            policy_number: Some("POL-42".to_string()),
            claim_amount: Some(dec!(1200)),
            ..Default::default()
        }
    }

    fn queue() -> (ReviewQueue, Arc<InMemoryAuditSink>) {
        let sink = Arc::new(InMemoryAuditSink::new());
        let dispatcher = Arc::new(AuditDispatcher::new(sink.clone()));
        (
            ReviewQueue::new(Arc::new(InMemoryReviewStore::new()), dispatcher),
            sink,
        )
    }

    #[test]
    fn test_resolution_applies_once() {
        let mut record = ReviewRecord::new(claim(), analysis(EligibilityDecision::Eligible, 40.0), "low");
        let resolution = Resolution {
            decision: ReviewDecision::Reject,
            reviewer_name: "Sam".to_string(),
            reviewer_notes: "Receipts missing".to_string(),
            resolved_at: Utc::now(),
        };
        record.apply_resolution(&resolution).unwrap();
        assert!(record.is_override());

        let second = Resolution {
            decision: ReviewDecision::Approve,
            ..resolution
        };
        assert!(record.apply_resolution(&second).is_err());
        assert_eq!(record.final_decision, Some(ReviewDecision::Reject));
    }

    #[test]
    fn test_decision_parsing() {
        assert_eq!("approve".parse::<ReviewDecision>().unwrap(), ReviewDecision::Approve);
        assert!("maybe".parse::<ReviewDecision>().is_err());
    }

    #[test]
    fn test_statistics_from_records() {
        let mut approved = ReviewRecord::new(claim(), analysis(EligibilityDecision::Eligible, 40.0), "low");
        approved
            .apply_resolution(&Resolution {
                decision: ReviewDecision::Approve,
                reviewer_name: "Sam".to_string(),
                reviewer_notes: "ok".to_string(),
                resolved_at: Utc::now(),
            })
            .unwrap();
        let pending = ReviewRecord::new(claim(), analysis(EligibilityDecision::NotEligible, 20.0), "low");

        let stats = ReviewStatistics::from_records(&[approved, pending]);
        assert_eq!(stats.total_reviews, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.reviewed, 1);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.rejected, 0);
        assert_eq!(stats.avg_confidence, 30.0);
        assert_eq!(ReviewStatistics::from_records(&[]).avg_confidence, 0.0);
    }

    #[tokio::test]
    async fn test_resolve_twice_reports_already_resolved() {
        let (queue, sink) = queue();
        let record = queue
            .enqueue(claim(), analysis(EligibilityDecision::Eligible, 45.0), "Low confidence")
            .await
            .unwrap();

        queue
            .resolve(record.review_id, ReviewDecision::Approve, "Avery", "Verified with garage")
            .await
            .unwrap();
        let err = queue
            .resolve(record.review_id, ReviewDecision::Reject, "Blake", "Disagree")
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::AlreadyResolved(id) if id == record.review_id));

        let stored = queue.get(record.review_id).await.unwrap();
        assert_eq!(stored.final_decision, Some(ReviewDecision::Approve));
        assert_eq!(stored.reviewer_name.as_deref(), Some("Avery"));
        assert_eq!(queue.history().await.unwrap().len(), 1);

        let recorded = sink.actions().await;
        assert_eq!(recorded, vec![actions::FLAGGED_FOR_REVIEW, actions::MANUAL_REVIEW_DECISION]);
    }

    #[tokio::test]
    async fn test_resolve_unknown_review() {
        let (queue, _) = queue();
        let err = queue
            .resolve(ReviewId::new(), ReviewDecision::Approve, "Avery", "notes")
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::ReviewNotFound(_)));
    }

    #[tokio::test]
    async fn test_blank_reviewer_is_rejected() {
        let (queue, _) = queue();
        let record = queue
            .enqueue(claim(), analysis(EligibilityDecision::Eligible, 45.0), "Low confidence")
            .await
            .unwrap();
        let err = queue
            .resolve(record.review_id, ReviewDecision::Approve, "  ", "notes")
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::Validation(_)));
        assert!(queue.get(record.review_id).await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_resolution_event_carries_ai_recommendation() {
        let (queue, sink) = queue();
        let record = queue
            .enqueue(claim(), analysis(EligibilityDecision::NotEligible, 35.0), "Low confidence")
            .await
            .unwrap();
        queue
            .resolve(record.review_id, ReviewDecision::Approve, "Avery", "Exclusion misread")
            .await
            .unwrap();

        let events = sink.events().await;
        let event = events.last().unwrap();
        assert_eq!(event.agent_name, AgentName::HumanReview);
        assert_eq!(event.policy_number, "POL-42");
        assert_eq!(event.inputs["ai_recommendation"], "NOT_ELIGIBLE");
        assert_eq!(event.outputs["final_decision"], "APPROVE");
        assert_eq!(event.metadata["human_override"], true);
        assert_eq!(event.metadata["original_ai_confidence"], 35.0);
    }
}
