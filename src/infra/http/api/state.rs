use std::sync::Arc;

use axum::http::HeaderName;

use crate::application::listings::ListingService;
use crate::application::payments::PaymentService;
use crate::application::ranking::PopularListingsService;
use crate::application::reviews::ReviewService;
use crate::infra::db::PostgresRepositories;

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub listings: Arc<ListingService>,
    pub popular: Arc<PopularListingsService>,
    pub reviews: Arc<ReviewService>,
    pub payments: Arc<PaymentService>,
    /// Absent when the router runs against non-Postgres repositories.
    pub db: Option<Arc<PostgresRepositories>>,
    pub rate_limiter: Arc<ApiRateLimiter>,
    pub user_header: HeaderName,
}
