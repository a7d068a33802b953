use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{
    CreateReviewParams, ListingsRepo, RepoError, ReviewsRepo, UpsertUserParams, UsersRepo,
};
use crate::domain::entities::ReviewRecord;
use crate::domain::error::DomainError;
use crate::domain::reviews::{is_self_review, normalize_comment, validate_rating};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("listing not found")]
    ListingNotFound,
    #[error("authors cannot review their own listing")]
    SelfReview,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateReviewCommand {
    pub listing_id: Uuid,
    pub rating: i16,
    pub comment: String,
}

#[derive(Clone)]
pub struct ReviewService {
    listings: Arc<dyn ListingsRepo>,
    reviews: Arc<dyn ReviewsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl ReviewService {
    pub fn new(
        listings: Arc<dyn ListingsRepo>,
        reviews: Arc<dyn ReviewsRepo>,
        users: Arc<dyn UsersRepo>,
    ) -> Self {
        Self {
            listings,
            reviews,
            users,
        }
    }

    pub async fn create(
        &self,
        author_id: &str,
        command: CreateReviewCommand,
    ) -> Result<ReviewRecord, ReviewError> {
        let rating = validate_rating(command.rating)?;
        let comment = normalize_comment(&command.comment)?;

        let listing = self
            .listings
            .find_by_id(command.listing_id)
            .await?
            .ok_or(ReviewError::ListingNotFound)?;
        if is_self_review(author_id, &listing.author_id) {
            return Err(ReviewError::SelfReview);
        }

        self.users
            .ensure_user(UpsertUserParams::external(author_id))
            .await?;

        self.reviews
            .create_review(CreateReviewParams {
                listing_id: listing.id,
                author_id: author_id.to_string(),
                rating,
                comment,
            })
            .await
            .map_err(|err| match err {
                RepoError::NotFound => ReviewError::ListingNotFound,
                other => ReviewError::Repo(other),
            })
    }
}
