use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{CreateReviewParams, RepoError, ReviewsRepo},
    domain::entities::ReviewRecord,
};

use super::{PostgresRepositories, listings::ReviewRow, map_sqlx_error};

#[async_trait]
impl ReviewsRepo for PostgresRepositories {
    async fn create_review(&self, params: CreateReviewParams) -> Result<ReviewRecord, RepoError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "INSERT INTO reviews (id, rating, comment, author_id, listing_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, rating, comment, author_id, listing_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.rating)
        .bind(&params.comment)
        .bind(&params.author_id)
        .bind(params.listing_id)
        .fetch_one(self.pool())
        .await
        .map_err(|err| match map_sqlx_error(err) {
            // The listing disappeared between the existence check and the insert.
            RepoError::InvalidInput { message } if message.contains("reviews_listing_id_fkey") => {
                RepoError::NotFound
            }
            other => other,
        })?;

        Ok(ReviewRecord::from(row))
    }
}
