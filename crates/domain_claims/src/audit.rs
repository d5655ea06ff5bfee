//! Audit trail contract
//!
//! Every side-effecting step of a decision emits exactly one [`AuditEvent`].
//! Events are append-only and retained indefinitely for compliance review, so
//! the serialized shape only ever grows: new fields must be optional on read.
//!
//! Writing an event must never block a claim decision. The
//! [`AuditDispatcher`] absorbs sink failures and keeps the event in a bounded
//! backlog that [`AuditDispatcher::retry_pending`] drains out-of-band. Every
//! parked or dropped event is logged in full so the local log can rebuild it.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use core_kernel::AuditEventId;

use crate::error::ClaimError;
use crate::ports::AuditSink;

/// Current shape of [`AuditEvent`]
pub const AUDIT_SCHEMA_VERSION: u32 = 1;

/// Backlog size used by [`AuditDispatcher::new`]
pub const DEFAULT_BACKLOG_CAPACITY: usize = 10_000;

/// Policy number recorded when the claim did not carry one
pub const UNKNOWN_POLICY: &str = "UNKNOWN";

/// Component that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentName {
    #[serde(rename = "OrchestratorAgent")]
    Orchestrator,
    #[serde(rename = "EligibilityAgent")]
    Eligibility,
    #[serde(rename = "FraudDetectionAgent")]
    FraudDetection,
    #[serde(rename = "HumanReviewAgent")]
    HumanReview,
}

impl AgentName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Orchestrator => "OrchestratorAgent",
            AgentName::Eligibility => "EligibilityAgent",
            AgentName::FraudDetection => "FraudDetectionAgent",
            AgentName::HumanReview => "HumanReviewAgent",
        }
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions recorded in the trail
pub mod actions {
    pub const WORKFLOW_INITIATION: &str = "workflow_initiation";
    pub const ELIGIBILITY_CHECK: &str = "eligibility_check";
    pub const FRAUD_DETECTION: &str = "fraud_detection";
    pub const ESCALATION_ASSESSMENT: &str = "escalation_assessment";
    pub const FLAGGED_FOR_REVIEW: &str = "flagged_for_review";
    pub const CLAIM_FINALIZED: &str = "claim_finalized";
    pub const MANUAL_REVIEW_DECISION: &str = "manual_review_decision";
}

/// One append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: AuditEventId,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub agent_name: AgentName,
    pub policy_number: String,
    pub action: String,
    #[serde(default)]
    pub inputs: Value,
    #[serde(default)]
    pub outputs: Value,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
    AUDIT_SCHEMA_VERSION
}

impl AuditEvent {
    /// Starts an event stamped with the current time
    pub fn new(agent_name: AgentName, policy_number: Option<&str>, action: impl Into<String>) -> Self {
        Self {
            event_id: AuditEventId::new(),
            schema_version: AUDIT_SCHEMA_VERSION,
            agent_name,
            policy_number: policy_number
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or(UNKNOWN_POLICY)
                .to_string(),
            action: action.into(),
            inputs: Value::Null,
            outputs: Value::Null,
            decision: None,
            metadata: Value::Null,
            timestamp: Utc::now(),
        }
    }

    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Value) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_decision(mut self, decision: impl Into<String>) -> Self {
        self.decision = Some(decision.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Delivers events to the configured sink without ever failing the caller
pub struct AuditDispatcher {
    sink: Arc<dyn AuditSink>,
    backlog: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
}

impl AuditDispatcher {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self::with_capacity(sink, DEFAULT_BACKLOG_CAPACITY)
    }

    /// Holds at most `capacity` undelivered events; the oldest goes first
    pub fn with_capacity(sink: Arc<dyn AuditSink>, capacity: usize) -> Self {
        Self {
            sink,
            backlog: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Records an event, parking it in the backlog if the sink fails
    pub async fn emit(&self, event: AuditEvent) {
        match self.sink.record(&event).await {
            Ok(()) => debug!(
                event_id = %event.event_id,
                agent = %event.agent_name,
                action = %event.action,
                "Audit event recorded"
            ),
            Err(err) => {
                warn!(
                    event_id = %event.event_id,
                    error = %err,
                    event = %event_json(&event),
                    "Audit write failed, event kept for retry"
                );
                let mut backlog = self.backlog.lock().await;
                backlog.push_back(event);
                self.enforce_capacity(&mut backlog);
            }
        }
    }

    /// Re-sends parked events in their original order
    ///
    /// Returns the number delivered. Fails with `AuditWrite` when any event
    /// is still undeliverable; those events stay in the backlog.
    pub async fn retry_pending(&self) -> Result<usize, ClaimError> {
        let parked = std::mem::take(&mut *self.backlog.lock().await);
        if parked.is_empty() {
            return Ok(0);
        }

        let mut delivered = 0;
        let mut still_parked = VecDeque::new();
        let mut last_error = None;
        for event in parked {
            match self.sink.record(&event).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    last_error = Some(err.to_string());
                    still_parked.push_back(event);
                }
            }
        }

        let remaining = still_parked.len();
        if remaining > 0 {
            // events emitted during the retry go after the older ones
            let mut backlog = self.backlog.lock().await;
            still_parked.append(&mut backlog);
            *backlog = still_parked;
            self.enforce_capacity(&mut backlog);
        }

        match last_error {
            Some(err) => Err(ClaimError::AuditWrite(format!(
                "{} delivered, {} still pending: {}",
                delivered, remaining, err
            ))),
            None => Ok(delivered),
        }
    }

    /// Last delivery attempt before the process exits
    ///
    /// Anything the sink still refuses is logged in full and returned.
    pub async fn flush(&self) -> Vec<AuditEvent> {
        if let Err(err) = self.retry_pending().await {
            warn!(error = %err, "Audit backlog not fully delivered");
        }
        let abandoned: Vec<AuditEvent> = self.backlog.lock().await.drain(..).collect();
        for event in &abandoned {
            error!(
                event_id = %event.event_id,
                event = %event_json(event),
                "Audit event undelivered at shutdown"
            );
        }
        abandoned
    }

    pub async fn backlog_len(&self) -> usize {
        self.backlog.lock().await.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn enforce_capacity(&self, backlog: &mut VecDeque<AuditEvent>) {
        while backlog.len() > self.capacity {
            if let Some(dropped) = backlog.pop_front() {
                error!(
                    event_id = %dropped.event_id,
                    capacity = self.capacity,
                    event = %event_json(&dropped),
                    "Audit backlog full, oldest event dropped"
                );
            }
        }
    }
}

fn event_json(event: &AuditEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}

/// Summary of a slice of the audit trail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub total_events: usize,
    pub by_agent: BTreeMap<String, usize>,
    pub by_action: BTreeMap<String, usize>,
    pub by_decision: BTreeMap<String, usize>,
    pub first_event: Option<DateTime<Utc>>,
    pub last_event: Option<DateTime<Utc>>,
}

impl AuditReport {
    pub fn from_events(events: &[AuditEvent]) -> Self {
        events.iter().fold(Self::default(), |mut report, event| {
            report.total_events += 1;
            *report.by_agent.entry(event.agent_name.to_string()).or_default() += 1;
            *report.by_action.entry(event.action.clone()).or_default() += 1;
            if let Some(decision) = &event.decision {
                *report.by_decision.entry(decision.clone()).or_default() += 1;
            }
            report.first_event = Some(match report.first_event {
                Some(first) => first.min(event.timestamp),
                None => event.timestamp,
            });
            report.last_event = Some(match report.last_event {
                Some(last) => last.max(event.timestamp),
                None => event.timestamp,
            });
            report
        })
    }
}
