//! Review DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

use domain_claims::{ReviewDecision, ReviewRecord};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolveReviewRequest {
    /// `APPROVE` or `REJECT`
    pub decision: ReviewDecision,
    #[validate(length(min = 1, max = 4000))]
    pub notes: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewListResponse {
    pub count: usize,
    pub reviews: Vec<ReviewRecord>,
}

impl From<Vec<ReviewRecord>> for ReviewListResponse {
    fn from(reviews: Vec<ReviewRecord>) -> Self {
        Self {
            count: reviews.len(),
            reviews,
        }
    }
}
