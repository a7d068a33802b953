use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::listings::{CreateListingCommand, UpdateListingCommand};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::AuthenticatedUser;
use crate::infra::http::api::models::{ListingCreateRequest, ListingUpdateRequest};
use crate::infra::http::api::state::ApiState;

use super::{listing_to_api, ranking_to_api};

pub async fn list_recent_listings(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let listings = state.listings.list_recent().await.map_err(listing_to_api)?;
    Ok(Json(listings))
}

pub async fn popular_listings(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let listings = state
        .popular
        .get_popular_listings()
        .await
        .map_err(ranking_to_api)?;
    Ok(Json(listings))
}

pub async fn get_listing(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .listings
        .get_by_id(id)
        .await
        .map_err(listing_to_api)?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;
    Ok(Json(detail))
}

pub async fn create_listing(
    State(state): State<ApiState>,
    user: AuthenticatedUser,
    Json(payload): Json<ListingCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateListingCommand {
        title: payload.title,
        description: payload.description,
        price: payload.price,
        latitude: payload.latitude,
        longitude: payload.longitude,
        image_urls: payload.images,
    };

    let listing = state
        .listings
        .create(user.as_str(), command)
        .await
        .map_err(listing_to_api)?;

    Ok((StatusCode::CREATED, Json(listing)))
}

pub async fn update_listing(
    State(state): State<ApiState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ListingUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateListingCommand {
        id,
        title: payload.title,
        description: payload.description,
        price: payload.price,
        latitude: payload.latitude,
        longitude: payload.longitude,
    };

    let listing = state
        .listings
        .update(user.as_str(), command)
        .await
        .map_err(listing_to_api)?;

    Ok(Json(listing))
}

pub async fn delete_listing(
    State(state): State<ApiState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .listings
        .delete(user.as_str(), id)
        .await
        .map_err(listing_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}
