//! PostgreSQL audit sink
//!
//! Events are inserted once and never updated. A replayed insert of the same
//! event id is ignored, which makes backlog retries idempotent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{AuditEventId, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_claims::{AgentName, AuditEvent, AuditReport, AuditSink};

use crate::error::StoreError;
use crate::postgres::ping;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditRow {
    pub event_id: Uuid,
    pub schema_version: i32,
    pub agent_name: String,
    pub policy_number: String,
    pub action: String,
    pub inputs: Json<Value>,
    pub outputs: Json<Value>,
    pub decision: Option<String>,
    pub metadata: Json<Value>,
    pub event_time: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEvent {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let agent_name: AgentName = serde_json::from_value(Value::String(row.agent_name))?;
        let schema_version = u32::try_from(row.schema_version)
            .map_err(|_| StoreError::InvalidRow(format!("schema version {}", row.schema_version)))?;

        Ok(AuditEvent {
            event_id: AuditEventId::from_uuid(row.event_id),
            schema_version,
            agent_name,
            policy_number: row.policy_number,
            action: row.action,
            inputs: row.inputs.0,
            outputs: row.outputs.0,
            decision: row.decision,
            metadata: row.metadata.0,
            timestamp: row.event_time,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reads the trail back, oldest first
    pub async fn trail(&self, policy_number: Option<&str>) -> Result<Vec<AuditEvent>, StoreError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT event_id, schema_version, agent_name, policy_number, action,
                   inputs, outputs, decision, metadata, event_time
            FROM audit_events
            WHERE $1::TEXT IS NULL OR policy_number = $1
            ORDER BY event_time, event_id
            "#,
        )
        .bind(policy_number)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditEvent::try_from).collect()
    }

    pub async fn report(&self, policy_number: Option<&str>) -> Result<AuditReport, StoreError> {
        let events = self.trail(policy_number).await?;
        Ok(AuditReport::from_events(&events))
    }

    async fn insert(&self, event: &AuditEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (
                event_id, schema_version, agent_name, policy_number, action,
                inputs, outputs, decision, metadata, event_time
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(*event.event_id.as_uuid())
        .bind(event.schema_version as i32)
        .bind(event.agent_name.as_str())
        .bind(&event.policy_number)
        .bind(&event.action)
        .bind(Json(&event.inputs))
        .bind(Json(&event.outputs))
        .bind(&event.decision)
        .bind(Json(&event.metadata))
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl DomainPort for PgAuditSink {}

#[async_trait]
impl HealthCheckable for PgAuditSink {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-audit-sink").await
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), PortError> {
        Ok(self.insert(event).await?)
    }
}
