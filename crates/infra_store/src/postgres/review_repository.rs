//! PostgreSQL review repository
//!
//! Records live in `review_records`; resolutions are archived by inserting
//! into `review_history` in the same transaction. A resolution locks the row
//! (`FOR UPDATE`) and then issues a guarded
//! `UPDATE ... WHERE status = 'pending'`, so of several concurrent attempts
//! exactly one commits and the rest observe a reviewed record.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError, ReviewId};
use domain_claims::{
    AnalysisResult, ClaimFacts, Resolution, ReviewDecision, ReviewRecord, ReviewStatus, ReviewStore,
};

use crate::error::StoreError;
use crate::postgres::ping;

const SELECT_RECORD: &str = r#"
    SELECT
        review_id,
        status,
        claim_data,
        analysis_result,
        flag_reason,
        confidence_score,
        reviewer_name,
        reviewer_notes,
        final_decision,
        created_at,
        resolved_at
    FROM review_records
"#;

/// Database row for a review record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub review_id: Uuid,
    pub status: String,
    pub claim_data: Json<ClaimFacts>,
    pub analysis_result: Json<AnalysisResult>,
    pub flag_reason: String,
    pub confidence_score: f64,
    pub reviewer_name: Option<String>,
    pub reviewer_notes: Option<String>,
    pub final_decision: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReviewRow> for ReviewRecord {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "pending" => ReviewStatus::Pending,
            "reviewed" => ReviewStatus::Reviewed,
            other => return Err(StoreError::InvalidRow(format!("unknown review status '{}'", other))),
        };
        let final_decision = row
            .final_decision
            .as_deref()
            .map(ReviewDecision::from_str)
            .transpose()
            .map_err(|e| StoreError::InvalidRow(e.to_string()))?;

        Ok(ReviewRecord {
            review_id: ReviewId::from_uuid(row.review_id),
            status,
            claim_data: row.claim_data.0,
            analysis_result: row.analysis_result.0,
            flag_reason: row.flag_reason,
            confidence_score: row.confidence_score,
            reviewer_name: row.reviewer_name,
            reviewer_notes: row.reviewer_notes,
            final_decision,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

fn into_records(rows: Vec<ReviewRow>) -> Result<Vec<ReviewRecord>, StoreError> {
    rows.into_iter().map(ReviewRecord::try_from).collect()
}

/// PostgreSQL-backed implementation of the `ReviewStore` port
#[derive(Debug, Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, record: &ReviewRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO review_records (
                review_id, status, policy_number, claim_data, analysis_result,
                flag_reason, confidence_score, reviewer_name, reviewer_notes,
                final_decision, created_at, resolved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(*record.review_id.as_uuid())
        .bind(record.status.as_str())
        .bind(record.policy_number())
        .bind(Json(&record.claim_data))
        .bind(Json(&record.analysis_result))
        .bind(&record.flag_reason)
        .bind(record.confidence_score)
        .bind(&record.reviewer_name)
        .bind(&record.reviewer_notes)
        .bind(record.final_decision.map(|d| d.as_str()))
        .bind(record.created_at)
        .bind(record.resolved_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find(&self, review_id: ReviewId) -> Result<ReviewRecord, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!("{} WHERE review_id = $1", SELECT_RECORD))
            .bind(*review_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("ReviewRecord", review_id))?;
        row.try_into()
    }

    pub async fn find_pending(&self) -> Result<Vec<ReviewRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "{} WHERE status = 'pending' ORDER BY seq",
            SELECT_RECORD
        ))
        .fetch_all(&self.pool)
        .await?;
        into_records(rows)
    }

    pub async fn find_all(&self) -> Result<Vec<ReviewRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!("{} ORDER BY seq", SELECT_RECORD))
            .fetch_all(&self.pool)
            .await?;
        into_records(rows)
    }

    pub async fn find_history(&self) -> Result<Vec<ReviewRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT
                r.review_id,
                r.status,
                r.claim_data,
                r.analysis_result,
                r.flag_reason,
                r.confidence_score,
                r.reviewer_name,
                r.reviewer_notes,
                r.final_decision,
                r.created_at,
                r.resolved_at
            FROM review_history h
            JOIN review_records r ON r.review_id = h.review_id
            ORDER BY h.history_seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        into_records(rows)
    }

    /// Applies a resolution atomically
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids, `Conflict` when the record was already
    /// reviewed (including by a concurrent caller that committed first)
    pub async fn apply_resolution(
        &self,
        review_id: ReviewId,
        resolution: &Resolution,
    ) -> Result<ReviewRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "{} WHERE review_id = $1 FOR UPDATE",
            SELECT_RECORD
        ))
        .bind(*review_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("ReviewRecord", review_id))?;

        let mut record = ReviewRecord::try_from(row)?;
        record
            .apply_resolution(resolution)
            .map_err(|e| StoreError::Conflict(e.to_string()))?;

        let updated = sqlx::query(
            r#"
            UPDATE review_records
            SET status = 'reviewed',
                final_decision = $2,
                reviewer_name = $3,
                reviewer_notes = $4,
                resolved_at = $5
            WHERE review_id = $1 AND status = 'pending'
            "#,
        )
        .bind(*review_id.as_uuid())
        .bind(resolution.decision.as_str())
        .bind(&resolution.reviewer_name)
        .bind(&resolution.reviewer_notes)
        .bind(resolution.resolved_at)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() != 1 {
            return Err(StoreError::Conflict(format!("review {} already resolved", review_id)));
        }

        sqlx::query("INSERT INTO review_history (review_id) VALUES ($1)")
            .bind(*review_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(record)
    }
}

impl DomainPort for PgReviewRepository {}

#[async_trait]
impl HealthCheckable for PgReviewRepository {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-review-repository").await
    }
}

#[async_trait]
impl ReviewStore for PgReviewRepository {
    #[instrument(skip(self, record), fields(review_id = %record.review_id))]
    async fn append(&self, record: &ReviewRecord) -> Result<(), PortError> {
        debug!("Inserting review record");
        Ok(self.insert(record).await?)
    }

    async fn pending(&self) -> Result<Vec<ReviewRecord>, PortError> {
        Ok(self.find_pending().await?)
    }

    async fn get(&self, review_id: ReviewId) -> Result<ReviewRecord, PortError> {
        Ok(self.find(review_id).await?)
    }

    #[instrument(skip(self, resolution), fields(review_id = %review_id))]
    async fn resolve(
        &self,
        review_id: ReviewId,
        resolution: &Resolution,
    ) -> Result<ReviewRecord, PortError> {
        debug!("Resolving review record");
        Ok(self.apply_resolution(review_id, resolution).await?)
    }

    async fn history(&self) -> Result<Vec<ReviewRecord>, PortError> {
        Ok(self.find_history().await?)
    }

    async fn all(&self) -> Result<Vec<ReviewRecord>, PortError> {
        Ok(self.find_all().await?)
    }
}
