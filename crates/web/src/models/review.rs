//! Review types.

use chrono::{DateTime, Utc};

use yelp_hotspring_core::{HotSpringId, Rating, ReviewId, UserId};

/// A stored review.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub rating: Rating,
    pub comment: String,
    pub reviewer_id: UserId,
    pub hot_spring_id: HotSpringId,
    pub updated_at: DateTime<Utc>,
}

/// A review joined with its reviewer's username, for the detail page.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewWithReviewer {
    pub id: ReviewId,
    pub rating: Rating,
    pub comment: String,
    pub reviewer_id: UserId,
    pub reviewer_username: String,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub rating: Rating,
    pub comment: String,
    pub reviewer_id: UserId,
    pub hot_spring_id: HotSpringId,
}
