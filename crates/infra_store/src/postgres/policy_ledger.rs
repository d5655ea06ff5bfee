//! PostgreSQL policy ledger
//!
//! Updated values are absolute (new totals, not deltas), so the write is an
//! upsert keyed by policy number.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use core_kernel::{DomainPort, PortError};
use domain_claims::{PolicyLedger, UpdatedValues};

use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct PgPolicyLedger {
    pool: PgPool,
}

impl PgPolicyLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current usage recorded for a policy
    pub async fn current(&self, policy_number: &str) -> Result<Option<UpdatedValues>, StoreError> {
        let row: Option<(Decimal, i32)> = sqlx::query_as(
            "SELECT past_claims_amount, claim_history_count FROM policy_ledger WHERE policy_number = $1",
        )
        .bind(policy_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(amount, count)| {
            Ok(UpdatedValues {
                new_past_claims_amount: amount,
                new_claim_history_count: u32::try_from(count)
                    .map_err(|_| StoreError::InvalidRow(format!("claim count {}", count)))?,
            })
        })
        .transpose()
    }

    async fn upsert(&self, policy_number: &str, values: &UpdatedValues) -> Result<(), StoreError> {
        let count = i32::try_from(values.new_claim_history_count)
            .map_err(|_| StoreError::InvalidRow(format!("claim count {}", values.new_claim_history_count)))?;

        sqlx::query(
            r#"
            INSERT INTO policy_ledger (policy_number, past_claims_amount, claim_history_count, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (policy_number) DO UPDATE
            SET past_claims_amount = EXCLUDED.past_claims_amount,
                claim_history_count = EXCLUDED.claim_history_count,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(policy_number)
        .bind(values.new_past_claims_amount)
        .bind(count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl DomainPort for PgPolicyLedger {}

#[async_trait]
impl PolicyLedger for PgPolicyLedger {
    async fn apply_claim_usage(
        &self,
        policy_number: &str,
        values: &UpdatedValues,
    ) -> Result<(), PortError> {
        self.upsert(policy_number, values).await?;
        info!(
            policy_number,
            past_claims_amount = %values.new_past_claims_amount,
            claim_history_count = values.new_claim_history_count,
            "Policy ledger row upserted"
        );
        Ok(())
    }
}
