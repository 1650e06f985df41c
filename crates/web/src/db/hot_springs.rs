//! Hot spring listing repository.
//!
//! Listings own their image records; both are written in one transaction so
//! a listing never appears with only part of its images.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use yelp_hotspring_core::{ExternalImageId, HotSpringId, NightlyPrice, UserId};

use super::RepositoryError;
use crate::models::hot_spring::{
    HotSpring, HotSpringImage, HotSpringSummary, NewHotSpring, NewImage,
};

#[derive(sqlx::FromRow)]
struct HotSpringRow {
    id: HotSpringId,
    title: String,
    description: String,
    price: NightlyPrice,
    location: String,
    author_id: UserId,
    author_username: String,
    updated_at: DateTime<Utc>,
}

impl HotSpringRow {
    fn with_images(self, images: Vec<HotSpringImage>) -> HotSpring {
        HotSpring {
            id: self.id,
            title: self.title,
            description: self.description,
            price: self.price,
            location: self.location,
            author_id: self.author_id,
            author_username: self.author_username,
            images,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for listing database operations.
pub struct HotSpringRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> HotSpringRepository<'a> {
    /// Create a new listing repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a listing together with its images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an image's external id is already recorded.
    /// Returns `RepositoryError::NotFound` if the author does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, listing, images), fields(image_count = images.len()))]
    pub async fn create(
        &self,
        author_id: UserId,
        listing: &NewHotSpring,
        images: &[NewImage],
    ) -> Result<HotSpringId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: HotSpringId = sqlx::query_scalar(
            r"
            INSERT INTO hot_springs (title, description, price, location, author_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(&listing.location)
        .bind(author_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "listing already exists"))?;

        insert_images(&mut tx, id, images).await?;
        tx.commit().await?;

        Ok(id)
    }

    /// Get a listing with its author's username and its images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: HotSpringId) -> Result<Option<HotSpring>, RepositoryError> {
        let row = sqlx::query_as::<_, HotSpringRow>(
            r"
            SELECT h.id, h.title, h.description, h.price, h.location,
                   h.author_id, u.username AS author_username, h.updated_at
            FROM hot_springs h
            JOIN users u ON u.id = h.author_id
            WHERE h.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let images = sqlx::query_as::<_, HotSpringImage>(
            r"
            SELECT id, url, external_id
            FROM hot_spring_images
            WHERE hot_spring_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(row.with_images(images)))
    }

    /// List every listing, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_summaries(&self) -> Result<Vec<HotSpringSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, HotSpringSummary>(
            r"
            SELECT h.id, h.title, h.location,
                   (SELECT i.url FROM hot_spring_images i
                    WHERE i.hot_spring_id = h.id
                    ORDER BY i.id ASC
                    LIMIT 1) AS cover_url,
                   (SELECT COUNT(*) FROM reviews r
                    WHERE r.hot_spring_id = h.id) AS review_count
            FROM hot_springs h
            ORDER BY h.updated_at DESC, h.id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Update a listing's fields and append any new images.
    ///
    /// Existing images are left untouched when `new_images` is empty.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the listing doesn't exist.
    /// Returns `RepositoryError::Conflict` if an image's external id is already recorded.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, listing, new_images), fields(image_count = new_images.len()))]
    pub async fn update(
        &self,
        id: HotSpringId,
        listing: &NewHotSpring,
        new_images: &[NewImage],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE hot_springs
            SET title = $2, description = $3, price = $4, location = $5,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(&listing.location)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        insert_images(&mut tx, id, new_images).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Delete a listing. Reviews and image records go with it by cascade.
    ///
    /// Returns the external ids of the listing's images so the caller can
    /// remove the remote assets.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the listing doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: HotSpringId) -> Result<Vec<ExternalImageId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let external_ids: Vec<ExternalImageId> = sqlx::query_scalar(
            r"
            SELECT external_id
            FROM hot_spring_images
            WHERE hot_spring_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM hot_springs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(external_ids)
    }

    /// Delete image records of one listing by external id, in one statement.
    ///
    /// Ids that don't belong to the listing are ignored. Returns the number of
    /// records removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, external_ids), fields(requested = external_ids.len()))]
    pub async fn delete_images(
        &self,
        id: HotSpringId,
        external_ids: &[ExternalImageId],
    ) -> Result<u64, RepositoryError> {
        if external_ids.is_empty() {
            return Ok(0);
        }

        let ids: Vec<&str> = external_ids.iter().map(ExternalImageId::as_str).collect();
        let result = sqlx::query(
            r"
            DELETE FROM hot_spring_images
            WHERE hot_spring_id = $1 AND external_id = ANY($2)
            ",
        )
        .bind(id)
        .bind(&ids)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Record uploaded images against a listing inside an open transaction.
async fn insert_images(
    tx: &mut Transaction<'_, Postgres>,
    id: HotSpringId,
    images: &[NewImage],
) -> Result<(), RepositoryError> {
    if images.is_empty() {
        return Ok(());
    }

    let urls: Vec<&str> = images.iter().map(|i| i.url.as_str()).collect();
    let external_ids: Vec<&str> = images.iter().map(|i| i.external_id.as_str()).collect();

    sqlx::query(
        r"
        INSERT INTO hot_spring_images (hot_spring_id, url, external_id)
        SELECT $1, u.url, u.external_id
        FROM UNNEST($2::TEXT[], $3::TEXT[]) WITH ORDINALITY AS u(url, external_id, position)
        ORDER BY u.position
        ",
    )
    .bind(id)
    .bind(&urls)
    .bind(&external_ids)
    .execute(&mut **tx)
    .await
    .map_err(|e| RepositoryError::from_write(e, "image already recorded"))?;

    Ok(())
}
