//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    ListingDetail, ListingRecord, PopularListing, ReviewRecord, UserRecord,
};
use crate::domain::geo::GeoPoint;
use crate::domain::price::Price;

#[derive(Debug, Clone, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateListingParams {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub location: GeoPoint,
    pub author_id: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateListingParams {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub location: GeoPoint,
}

#[derive(Debug, Clone)]
pub struct CreateReviewParams {
    pub listing_id: Uuid,
    pub author_id: String,
    pub rating: i16,
    pub comment: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpsertUserParams {
    pub external_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
}

impl UpsertUserParams {
    pub fn external(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait ListingsRepo: Send + Sync {
    /// Top `limit` listings by review count, ties broken by id ascending.
    async fn list_popular(&self, limit: u32) -> Result<Vec<PopularListing>, RepoError>;

    /// Newest listings first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<ListingRecord>, RepoError>;

    /// Keyset page over all listings ordered by id.
    async fn list_after(
        &self,
        after: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<ListingRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ListingRecord>, RepoError>;

    async fn find_detail(&self, id: Uuid) -> Result<Option<ListingDetail>, RepoError>;
}

#[async_trait]
pub trait ListingsWriteRepo: Send + Sync {
    async fn create_listing(&self, params: CreateListingParams)
    -> Result<ListingRecord, RepoError>;

    async fn update_listing(&self, params: UpdateListingParams)
    -> Result<ListingRecord, RepoError>;

    /// Images and reviews go with the listing.
    async fn delete_listing(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ReviewsRepo: Send + Sync {
    async fn create_review(&self, params: CreateReviewParams) -> Result<ReviewRecord, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_external_id(&self, external_id: &str)
    -> Result<Option<UserRecord>, RepoError>;

    /// Insert the user if absent; profile fields are only filled, never cleared.
    async fn ensure_user(&self, params: UpsertUserParams) -> Result<UserRecord, RepoError>;

    /// Mark the user premium until `until`. `None` when no such user exists.
    async fn grant_premium(
        &self,
        external_id: &str,
        until: OffsetDateTime,
    ) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait SeedRepo: Send + Sync {
    /// Remove every user, listing, image and review.
    async fn clear_all(&self) -> Result<(), RepoError>;
}
