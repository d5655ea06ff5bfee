//! Claim decision engine errors

use thiserror::Error;

use core_kernel::{CoreError, PortError, ReviewId};

/// Errors that can occur in the claim decision engine
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Claim or policy data was entirely absent
    #[error("Required input missing: {0}")]
    InputMissing(String),

    /// An external collaborator could not be reached
    #[error("Collaborator unavailable: {collaborator}: {reason}")]
    CollaboratorUnavailable { collaborator: String, reason: String },

    #[error("Review not found: {0}")]
    ReviewNotFound(ReviewId),

    #[error("Review already resolved: {0}")]
    AlreadyResolved(ReviewId),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Audit write failed: {0}")]
    AuditWrite(String),

    #[error("Invalid fraud probability: {0}")]
    InvalidFraudScore(f64),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ClaimError {
    /// Creates a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        ClaimError::Validation(msg.into())
    }

    /// Creates a collaborator-unavailable error
    pub fn unavailable(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        ClaimError::CollaboratorUnavailable {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }

    /// Maps a review-store failure for the given review onto the queue's taxonomy
    pub(crate) fn from_store(review_id: ReviewId, err: PortError) -> Self {
        match err {
            PortError::NotFound { .. } => ClaimError::ReviewNotFound(review_id),
            PortError::Conflict { .. } => ClaimError::AlreadyResolved(review_id),
            other => ClaimError::Port(other),
        }
    }
}
