pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use extract::AuthenticatedUser;
pub use state::ApiState;

use axum::{
    Router,
    routing::{get, post},
};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/listings",
            get(handlers::list_recent_listings).post(handlers::create_listing),
        )
        .route("/api/listings/popular", get(handlers::popular_listings))
        .route(
            "/api/listings/{id}",
            get(handlers::get_listing)
                .patch(handlers::update_listing)
                .delete(handlers::delete_listing),
        )
        .route("/api/listings/{id}/reviews", post(handlers::create_review))
        .route("/api/stripe/webhook", post(handlers::payment_webhook))
        .with_state(state)
}
