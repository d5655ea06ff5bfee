//! PostgreSQL adapters
//!
//! Each adapter implements one engine port over a shared `PgPool`. Schema is
//! managed by the embedded migrations in [`crate::pool::MIGRATOR`].

pub mod audit_sink;
pub mod policy_ledger;
pub mod review_repository;

pub use audit_sink::PgAuditSink;
pub use policy_ledger::PgPolicyLedger;
pub use review_repository::PgReviewRepository;

use core_kernel::{HealthCheckResult, HealthCheckable};
use sqlx::PgPool;

/// Checks database connectivity with `SELECT 1`
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult::healthy(adapter_id, latency_ms),
        Err(e) => {
            let mut unhealthy = HealthCheckResult::unhealthy(adapter_id, format!("Database error: {}", e));
            unhealthy.latency_ms = latency_ms;
            unhealthy
        }
    }
}

/// Health of the shared pool, for readiness probes
#[derive(Debug, Clone)]
pub struct PgHealth {
    pool: PgPool,
}

impl PgHealth {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HealthCheckable for PgHealth {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres").await
    }
}
