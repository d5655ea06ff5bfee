//! In-memory engine harness
//!
//! Wires a [`DecisionOrchestrator`] to the mock adapters and keeps handles to
//! them so tests can inspect what the engine wrote.

use std::sync::Arc;

use domain_claims::ports::mock::{
    InMemoryAuditSink, InMemoryPolicyLedger, InMemoryReviewStore, StaticExclusionClassifier,
};
use domain_claims::{DecisionOrchestrator, EngineConfig, ExclusionAssessment};

pub struct TestEngine {
    pub orchestrator: DecisionOrchestrator,
    pub store: Arc<InMemoryReviewStore>,
    pub audit: Arc<InMemoryAuditSink>,
    pub ledger: Arc<InMemoryPolicyLedger>,
}

impl TestEngine {
    /// Engine with default configuration and no exclusion classifier
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(config, None)
    }

    /// Engine whose classifier always returns `assessment`
    pub fn with_exclusion_verdict(assessment: ExclusionAssessment) -> Self {
        Self::build(
            EngineConfig::default(),
            Some(Arc::new(StaticExclusionClassifier::returning(assessment))),
        )
    }

    /// Engine whose classifier is always unreachable
    pub fn with_unavailable_classifier() -> Self {
        Self::build(
            EngineConfig::default(),
            Some(Arc::new(StaticExclusionClassifier::unavailable("classifier offline"))),
        )
    }

    fn build(config: EngineConfig, classifier: Option<Arc<StaticExclusionClassifier>>) -> Self {
        let store = Arc::new(InMemoryReviewStore::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let ledger = Arc::new(InMemoryPolicyLedger::new());

        let mut orchestrator = DecisionOrchestrator::new(config, store.clone(), audit.clone())
            .with_policy_ledger(ledger.clone());
        if let Some(classifier) = classifier {
            orchestrator = orchestrator.with_exclusion_classifier(classifier);
        }

        Self {
            orchestrator,
            store,
            audit,
            ledger,
        }
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}
