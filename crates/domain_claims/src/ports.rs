//! Decision Engine Ports
//!
//! The engine owns none of its storage and none of its external judgement.
//! Everything it talks to sits behind one of these traits and is injected as
//! an `Arc<dyn ...>` by the caller:
//!
//! - **ReviewStore**: durable queue of escalated claims plus resolution history
//! - **AuditSink**: append-only destination for audit events
//! - **ExclusionClassifier**: external judgement on whether a claim reason
//!   falls under the policy's exclusion text
//! - **PolicyLedger**: applies approved claim usage back to the policy record
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use domain_claims::{DecisionOrchestrator, EngineConfig};
//!
//! let orchestrator = DecisionOrchestrator::new(EngineConfig::default(), store, sink)
//!     .with_exclusion_classifier(classifier)
//!     .with_policy_ledger(ledger);
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, HealthCheckable, PortError, ReviewId};

use crate::audit::AuditEvent;
use crate::eligibility::ExclusionAssessment;
use crate::facts::UpdatedValues;
use crate::review::{Resolution, ReviewRecord};

/// Durable storage for review records
///
/// Implementations must serialize writers so that concurrent appends are never
/// lost, and must make `resolve` atomic: of several concurrent resolutions of
/// one review exactly one succeeds and the others get `PortError::Conflict`.
#[async_trait]
pub trait ReviewStore: DomainPort + HealthCheckable {
    /// Durably appends a new pending record
    async fn append(&self, record: &ReviewRecord) -> Result<(), PortError>;

    /// Pending records in insertion order
    async fn pending(&self) -> Result<Vec<ReviewRecord>, PortError>;

    /// Fetches one record in whatever state it is
    ///
    /// # Returns
    ///
    /// The record, or `PortError::NotFound`
    async fn get(&self, review_id: ReviewId) -> Result<ReviewRecord, PortError>;

    /// Moves a pending record to reviewed and archives it to history
    ///
    /// # Returns
    ///
    /// The resolved record, `PortError::NotFound` for unknown ids, or
    /// `PortError::Conflict` when the record was already reviewed
    async fn resolve(
        &self,
        review_id: ReviewId,
        resolution: &Resolution,
    ) -> Result<ReviewRecord, PortError>;

    /// Archived resolutions in resolution order
    async fn history(&self) -> Result<Vec<ReviewRecord>, PortError>;

    /// Every record, pending and reviewed, in insertion order
    async fn all(&self) -> Result<Vec<ReviewRecord>, PortError>;
}

/// Append-only destination for audit events
#[async_trait]
pub trait AuditSink: DomainPort + HealthCheckable {
    async fn record(&self, event: &AuditEvent) -> Result<(), PortError>;
}

/// External exclusion-text classifier
#[async_trait]
pub trait ExclusionClassifier: DomainPort {
    async fn classify(
        &self,
        claim_reason: &str,
        exclusions: &str,
    ) -> Result<ExclusionAssessment, PortError>;
}

/// Write-back of approved claim usage to the policy record
#[async_trait]
pub trait PolicyLedger: DomainPort {
    async fn apply_claim_usage(
        &self,
        policy_number: &str,
        values: &UpdatedValues,
    ) -> Result<(), PortError>;
}

/// In-memory implementations of the engine ports for testing
///
/// These adapters keep everything in process memory and are useful for unit
/// testing the engine without a filesystem or database.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    #[derive(Debug, Default)]
    struct QueueState {
        records: Vec<ReviewRecord>,
        history: Vec<ReviewRecord>,
    }

    /// In-memory review store
    #[derive(Debug, Default)]
    pub struct InMemoryReviewStore {
        state: Arc<RwLock<QueueState>>,
    }

    impl InMemoryReviewStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for InMemoryReviewStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryReviewStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("memory-review-store", 0)
        }
    }

    #[async_trait]
    impl ReviewStore for InMemoryReviewStore {
        async fn append(&self, record: &ReviewRecord) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if state.records.iter().any(|r| r.review_id == record.review_id) {
                return Err(PortError::conflict(format!(
                    "review {} already exists",
                    record.review_id
                )));
            }
            state.records.push(record.clone());
            Ok(())
        }

        async fn pending(&self) -> Result<Vec<ReviewRecord>, PortError> {
            let state = self.state.read().await;
            Ok(state.records.iter().filter(|r| r.is_pending()).cloned().collect())
        }

        async fn get(&self, review_id: ReviewId) -> Result<ReviewRecord, PortError> {
            self.state
                .read()
                .await
                .records
                .iter()
                .find(|r| r.review_id == review_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("ReviewRecord", review_id))
        }

        async fn resolve(
            &self,
            review_id: ReviewId,
            resolution: &Resolution,
        ) -> Result<ReviewRecord, PortError> {
            let mut state = self.state.write().await;
            let record = state
                .records
                .iter_mut()
                .find(|r| r.review_id == review_id)
                .ok_or_else(|| PortError::not_found("ReviewRecord", review_id))?;
            record
                .apply_resolution(resolution)
                .map_err(|e| PortError::conflict(e.to_string()))?;
            let resolved = record.clone();
            state.history.push(resolved.clone());
            Ok(resolved)
        }

        async fn history(&self) -> Result<Vec<ReviewRecord>, PortError> {
            Ok(self.state.read().await.history.clone())
        }

        async fn all(&self) -> Result<Vec<ReviewRecord>, PortError> {
            Ok(self.state.read().await.records.clone())
        }
    }

    /// In-memory audit sink that can be switched into a failing mode
    #[derive(Debug, Default)]
    pub struct InMemoryAuditSink {
        events: Arc<RwLock<Vec<AuditEvent>>>,
        failing: Arc<RwLock<bool>>,
    }

    impl InMemoryAuditSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes subsequent writes fail until switched back
        pub async fn set_failing(&self, failing: bool) {
            *self.failing.write().await = failing;
        }

        pub async fn events(&self) -> Vec<AuditEvent> {
            self.events.read().await.clone()
        }

        pub async fn actions(&self) -> Vec<String> {
            self.events.read().await.iter().map(|e| e.action.clone()).collect()
        }
    }

    impl DomainPort for InMemoryAuditSink {}

    #[async_trait]
    impl HealthCheckable for InMemoryAuditSink {
        async fn health_check(&self) -> HealthCheckResult {
            if *self.failing.read().await {
                HealthCheckResult::unhealthy("memory-audit-sink", "configured to fail")
            } else {
                HealthCheckResult::healthy("memory-audit-sink", 0)
            }
        }
    }

    #[async_trait]
    impl AuditSink for InMemoryAuditSink {
        async fn record(&self, event: &AuditEvent) -> Result<(), PortError> {
            if *self.failing.read().await {
                return Err(PortError::unavailable("memory-audit-sink"));
            }
            self.events.write().await.push(event.clone());
            Ok(())
        }
    }

    /// Classifier that always gives the same answer
    #[derive(Debug)]
    pub struct StaticExclusionClassifier {
        verdict: Result<ExclusionAssessment, String>,
        calls: AtomicUsize,
    }

    impl StaticExclusionClassifier {
        pub fn returning(assessment: ExclusionAssessment) -> Self {
            Self {
                verdict: Ok(assessment),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn unavailable(reason: impl Into<String>) -> Self {
            Self {
                verdict: Err(reason.into()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DomainPort for StaticExclusionClassifier {}

    #[async_trait]
    impl ExclusionClassifier for StaticExclusionClassifier {
        async fn classify(
            &self,
            _claim_reason: &str,
            _exclusions: &str,
        ) -> Result<ExclusionAssessment, PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict.clone().map_err(PortError::unavailable)
        }
    }

    /// Ledger that records applied updates
    #[derive(Debug, Default)]
    pub struct InMemoryPolicyLedger {
        applied: Arc<RwLock<Vec<(String, UpdatedValues)>>>,
    }

    impl InMemoryPolicyLedger {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn applied(&self) -> Vec<(String, UpdatedValues)> {
            self.applied.read().await.clone()
        }
    }

    impl DomainPort for InMemoryPolicyLedger {}

    #[async_trait]
    impl PolicyLedger for InMemoryPolicyLedger {
        async fn apply_claim_usage(
            &self,
            policy_number: &str,
            values: &UpdatedValues,
        ) -> Result<(), PortError> {
            self.applied
                .write()
                .await
                .push((policy_number.to_string(), *values));
            Ok(())
        }
    }
}
