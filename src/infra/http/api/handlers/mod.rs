mod listings;
mod payments;
mod reviews;

pub use listings::*;
pub use payments::*;
pub use reviews::*;

use axum::http::StatusCode;

use crate::application::listings::ListingError;
use crate::application::payments::WebhookError;
use crate::application::ranking::RankingError;
use crate::application::repos::RepoError;
use crate::application::reviews::ReviewError;
use crate::domain::error::DomainError;

use super::error::{ApiError, codes};

fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            None,
        )
        .with_detail(message),
    }
}

fn domain_to_api(message: &'static str, err: DomainError) -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        codes::INVALID_INPUT,
        message,
        Some(err.to_string()),
    )
}

fn listing_to_api(err: ListingError) -> ApiError {
    match err {
        ListingError::Domain(err) => domain_to_api("Invalid listing", err),
        ListingError::NotFound => ApiError::not_found("Listing not found"),
        ListingError::Forbidden => ApiError::forbidden("Listing belongs to another user"),
        ListingError::Repo(err) => repo_to_api(err),
    }
}

fn review_to_api(err: ReviewError) -> ApiError {
    match err {
        ReviewError::Domain(err) => domain_to_api("Invalid review", err),
        ReviewError::ListingNotFound => ApiError::not_found("Listing not found"),
        ReviewError::SelfReview => ApiError::new(
            StatusCode::FORBIDDEN,
            codes::SELF_REVIEW,
            "Authors cannot review their own listing",
            None,
        ),
        ReviewError::Repo(err) => repo_to_api(err),
    }
}

fn ranking_to_api(err: RankingError) -> ApiError {
    let detail = match &err {
        RankingError::Compute(source) => format!("{err}: {source}"),
        RankingError::ComputeTimeout(_) => err.to_string(),
    };
    ApiError::new(
        StatusCode::SERVICE_UNAVAILABLE,
        codes::RANKING_UNAVAILABLE,
        "Popular listings are temporarily unavailable",
        None,
    )
    .with_detail(detail)
}

fn webhook_to_api(err: WebhookError) -> ApiError {
    match err {
        WebhookError::NotConfigured => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::NOT_CONFIGURED,
            "Webhook secret is not configured",
            None,
        ),
        WebhookError::SignatureInvalid(err) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::SIGNATURE_INVALID,
            "Webhook signature verification failed",
            Some(err.to_string()),
        ),
        WebhookError::MissingMetadata => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::MISSING_METADATA,
            "Checkout session is missing the user reference",
            None,
        ),
        WebhookError::Repo(err) => repo_to_api(err),
    }
}
