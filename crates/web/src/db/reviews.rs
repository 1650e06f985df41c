//! Review repository, including the per-listing rating average.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use yelp_hotspring_core::{HotSpringId, RatingAverage, ReviewId};

use super::RepositoryError;
use crate::models::review::{NewReview, Review, ReviewWithReviewer};

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a review.
    ///
    /// The listing's `updated_at` is not touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the listing or reviewer is gone.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, review), fields(hot_spring_id = %review.hot_spring_id))]
    pub async fn create(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, Review>(
            r"
            INSERT INTO reviews (rating, comment, reviewer_id, hot_spring_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, rating, comment, reviewer_id, hot_spring_id, updated_at
            ",
        )
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.reviewer_id)
        .bind(review.hot_spring_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "review already exists"))?;

        Ok(row)
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, Review>(
            r"
            SELECT id, rating, comment, reviewer_id, hot_spring_id, updated_at
            FROM reviews
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// All reviews of a listing with reviewer usernames, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_hot_spring(
        &self,
        hot_spring_id: HotSpringId,
    ) -> Result<Vec<ReviewWithReviewer>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewWithReviewer>(
            r"
            SELECT r.id, r.rating, r.comment, r.reviewer_id,
                   u.username AS reviewer_username, r.updated_at
            FROM reviews r
            JOIN users u ON u.id = r.reviewer_id
            WHERE r.hot_spring_id = $1
            ORDER BY r.updated_at DESC, r.id DESC
            ",
        )
        .bind(hot_spring_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete a review.
    ///
    /// # Returns
    ///
    /// Returns `true` if the review was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mean rating of a listing, rounded to two places; zero without reviews.
    ///
    /// Computed on every call. Nothing is cached or stored on the listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn average_rating(
        &self,
        hot_spring_id: HotSpringId,
    ) -> Result<RatingAverage, RepositoryError> {
        let mean: Option<Decimal> = sqlx::query_scalar(
            r"
            SELECT AVG(rating)::NUMERIC
            FROM reviews
            WHERE hot_spring_id = $1
            ",
        )
        .bind(hot_spring_id)
        .fetch_one(self.pool)
        .await?;

        Ok(RatingAverage::from_mean(mean))
    }
}
