//! Claim decision handlers

use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::info;
use validator::Validate;

use domain_claims::DecisionOutcome;

use crate::auth::Claims;
use crate::dto::decisions::DecideClaimRequest;
use crate::{error::ApiError, AppState};

/// Runs one claim through the engine
///
/// Returns 200 with the final decision, or 202 with the review record when the
/// claim was parked for a human.
pub async fn decide_claim(
    State(state): State<AppState>,
    Extension(user): Extension<Claims>,
    Json(request): Json<DecideClaimRequest>,
) -> Result<(StatusCode, Json<DecisionOutcome>), ApiError> {
    request.validate()?;

    let outcome = state.orchestrator.process(request.into()).await?;

    let status = match &outcome {
        DecisionOutcome::Finalized(decision) => {
            info!(
                decision_id = %decision.decision_id,
                disposition = ?decision.disposition,
                requested_by = %user.sub,
                "Claim decided"
            );
            StatusCode::OK
        }
        DecisionOutcome::Escalated(record) => {
            info!(
                review_id = %record.review_id,
                requested_by = %user.sub,
                "Claim escalated"
            );
            StatusCode::ACCEPTED
        }
    };

    Ok((status, Json(outcome)))
}
