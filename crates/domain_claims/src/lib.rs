//! Claim Decision Engine
//!
//! Decides whether a claim is eligible for payout, folds in an externally
//! supplied fraud probability, and routes every decision either to automatic
//! finalization or to a durable human review queue.
//!
//! # Decision Flow
//!
//! ```text
//! ClaimFacts + PolicySnapshot
//!     -> EligibilityEvaluator   (ELIGIBLE | NOT_ELIGIBLE | ERROR, confidence)
//!     -> fraud classification   (ELIGIBLE only)
//!     -> EscalationPolicy       (auto-apply or review)
//!     -> ReviewQueue | FinalDecision
//! ```
//!
//! Storage, audit persistence and exclusion-text judgement are ports
//! implemented outside this crate.

pub mod audit;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod escalation;
pub mod facts;
pub mod fraud;
pub mod orchestrator;
pub mod ports;
pub mod review;

pub use audit::{actions, AgentName, AuditDispatcher, AuditEvent, AuditReport};
pub use config::{EngineConfig, EscalationConfig, ScoringConfig};
pub use eligibility::{
    labels, CheckKind, CheckNote, CheckStatus, EligibilityDecision, EligibilityEvaluator,
    EligibilityResult, ExclusionAssessment, ExclusionLookup,
};
pub use error::ClaimError;
pub use escalation::{EscalationPolicy, EscalationTrigger};
pub use facts::{ClaimFacts, DriverProfile, PolicySnapshot, PolicyStatus, UpdatedValues};
pub use fraud::{FraudAssessment, RiskLevel};
pub use orchestrator::{
    DecisionOrchestrator, DecisionOutcome, DecisionRequest, Disposition, ExclusionSignal,
    FinalDecision, FraudSignal,
};
pub use ports::{AuditSink, ExclusionClassifier, PolicyLedger, ReviewStore};
pub use review::{
    AnalysisResult, Resolution, ReviewDecision, ReviewQueue, ReviewRecord, ReviewStatistics,
    ReviewStatus,
};
