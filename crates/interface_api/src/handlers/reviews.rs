//! Human review handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use validator::Validate;

use core_kernel::ReviewId;
use domain_claims::{ReviewRecord, ReviewStatistics};

use crate::auth::{permissions, require_permission, Claims};
use crate::dto::reviews::{ResolveReviewRequest, ReviewListResponse};
use crate::{error::ApiError, AppState};

fn parse_review_id(raw: &str) -> Result<ReviewId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid review id: {}", raw)))
}

/// Lists pending reviews, oldest first
pub async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<ReviewListResponse>, ApiError> {
    let pending = state.orchestrator.queue().list_pending().await?;
    Ok(Json(pending.into()))
}

/// Lists resolved reviews in resolution order
pub async fn list_history(
    State(state): State<AppState>,
) -> Result<Json<ReviewListResponse>, ApiError> {
    let history = state.orchestrator.queue().history().await?;
    Ok(Json(history.into()))
}

pub async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<ReviewStatistics>, ApiError> {
    Ok(Json(state.orchestrator.queue().statistics().await?))
}

/// Gets a review by ID
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReviewRecord>, ApiError> {
    let review_id = parse_review_id(&id)?;
    Ok(Json(state.orchestrator.queue().get(review_id).await?))
}

/// Records the caller's decision on a pending review
///
/// The token subject is recorded as the reviewer.
pub async fn resolve_review(
    State(state): State<AppState>,
    Extension(user): Extension<Claims>,
    Path(id): Path<String>,
    Json(request): Json<ResolveReviewRequest>,
) -> Result<Json<ReviewRecord>, ApiError> {
    require_permission(&user, permissions::CLAIM_APPROVE)?;
    request.validate()?;
    let review_id = parse_review_id(&id)?;

    let record = state
        .orchestrator
        .resolve_review(review_id, request.decision, &user.sub, &request.notes)
        .await?;

    Ok(Json(record))
}
