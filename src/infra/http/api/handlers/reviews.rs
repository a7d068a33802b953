use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::reviews::CreateReviewCommand;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::AuthenticatedUser;
use crate::infra::http::api::models::ReviewCreateRequest;
use crate::infra::http::api::state::ApiState;

use super::review_to_api;

pub async fn create_review(
    State(state): State<ApiState>,
    user: AuthenticatedUser,
    Path(listing_id): Path<Uuid>,
    Json(payload): Json<ReviewCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let review = state
        .reviews
        .create(
            user.as_str(),
            CreateReviewCommand {
                listing_id,
                rating: payload.rating,
                comment: payload.comment,
            },
        )
        .await
        .map_err(review_to_api)?;

    Ok((StatusCode::CREATED, Json(review)))
}
