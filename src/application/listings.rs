use std::sync::Arc;

use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::application::mirror::{IndexMirror, record_failure};
use crate::application::repos::{
    CreateListingParams, ListingsRepo, ListingsWriteRepo, RepoError, UpdateListingParams,
    UpsertUserParams, UsersRepo,
};
use crate::domain::entities::{ListingDetail, ListingRecord};
use crate::domain::error::DomainError;
use crate::domain::geo::GeoPoint;
use crate::domain::price::Price;

pub const RECENT_LISTINGS_LIMIT: u32 = 20;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("listing not found")]
    NotFound,
    #[error("listing belongs to another user")]
    Forbidden,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateListingCommand {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub latitude: f64,
    pub longitude: f64,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateListingCommand {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone)]
pub struct ListingService {
    reader: Arc<dyn ListingsRepo>,
    writer: Arc<dyn ListingsWriteRepo>,
    users: Arc<dyn UsersRepo>,
    mirror: Option<Arc<IndexMirror>>,
}

impl ListingService {
    pub fn new(
        reader: Arc<dyn ListingsRepo>,
        writer: Arc<dyn ListingsWriteRepo>,
        users: Arc<dyn UsersRepo>,
    ) -> Self {
        Self {
            reader,
            writer,
            users,
            mirror: None,
        }
    }

    /// Set the search index mirror for this service (optional).
    pub fn with_mirror_opt(mut self, mirror: Option<Arc<IndexMirror>>) -> Self {
        self.mirror = mirror;
        self
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<ListingDetail>, ListingError> {
        self.reader
            .find_detail(id)
            .await
            .map_err(ListingError::from)
    }

    pub async fn list_recent(&self) -> Result<Vec<ListingRecord>, ListingError> {
        self.reader
            .list_recent(RECENT_LISTINGS_LIMIT)
            .await
            .map_err(ListingError::from)
    }

    pub async fn create(
        &self,
        author_id: &str,
        command: CreateListingCommand,
    ) -> Result<ListingRecord, ListingError> {
        let title = required_text("title", &command.title)?;
        let description = required_text("description", &command.description)?;
        let location = GeoPoint::new(command.latitude, command.longitude)?;
        let image_urls = command
            .image_urls
            .iter()
            .map(|raw| validate_image_url(raw))
            .collect::<Result<Vec<_>, _>>()?;

        self.users
            .ensure_user(UpsertUserParams::external(author_id))
            .await?;

        let listing = self
            .writer
            .create_listing(CreateListingParams {
                title,
                description,
                price: command.price,
                location,
                author_id: author_id.to_string(),
                image_urls,
            })
            .await?;

        if let Some(mirror) = &self.mirror
            && let Err(err) = mirror.upsert(&listing).await
        {
            record_failure("upsert", listing.id, &err);
        }

        Ok(listing)
    }

    pub async fn update(
        &self,
        author_id: &str,
        command: UpdateListingCommand,
    ) -> Result<ListingRecord, ListingError> {
        let title = required_text("title", &command.title)?;
        let description = required_text("description", &command.description)?;
        let location = GeoPoint::new(command.latitude, command.longitude)?;

        self.owned_listing(author_id, command.id).await?;

        let listing = self
            .writer
            .update_listing(UpdateListingParams {
                id: command.id,
                title,
                description,
                price: command.price,
                location,
            })
            .await
            .map_err(not_found_or_repo)?;

        if let Some(mirror) = &self.mirror
            && let Err(err) = mirror.upsert(&listing).await
        {
            record_failure("upsert", listing.id, &err);
        }

        Ok(listing)
    }

    pub async fn delete(&self, author_id: &str, id: Uuid) -> Result<(), ListingError> {
        self.owned_listing(author_id, id).await?;
        self.writer
            .delete_listing(id)
            .await
            .map_err(not_found_or_repo)?;

        if let Some(mirror) = &self.mirror
            && let Err(err) = mirror.remove(id).await
        {
            record_failure("remove", id, &err);
        }

        Ok(())
    }

    async fn owned_listing(
        &self,
        author_id: &str,
        id: Uuid,
    ) -> Result<ListingRecord, ListingError> {
        let listing = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(ListingError::NotFound)?;
        if listing.author_id != author_id {
            return Err(ListingError::Forbidden);
        }
        Ok(listing)
    }
}

fn not_found_or_repo(err: RepoError) -> ListingError {
    match err {
        RepoError::NotFound => ListingError::NotFound,
        other => ListingError::Repo(other),
    }
}

fn required_text(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::blank(field));
    }
    Ok(trimmed.to_string())
}

fn validate_image_url(raw: &str) -> Result<String, DomainError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| DomainError::invalid("image_urls", format!("`{raw}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DomainError::invalid(
            "image_urls",
            format!("`{raw}` must use http or https"),
        ));
    }
    Ok(url.into())
}
