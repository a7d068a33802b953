use axum::extract::{FromRequestParts, MatchedPath};
use axum::http::request::Parts;

use super::error::ApiError;
use super::state::ApiState;

/// External id of the caller, as asserted by the identity gateway in front of
/// this service. Extracting it also charges the caller's rate-limit bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<ApiState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(&state.user_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(ApiError::unauthorized)?;

        let route = parts
            .extensions
            .get::<MatchedPath>()
            .map(|path| path.as_str())
            .unwrap_or_else(|| parts.uri.path());
        let route_key = format!("{} {route}", parts.method);

        if let Err(retry_after) = state.rate_limiter.check(user_id, &route_key) {
            return Err(ApiError::rate_limited(retry_after));
        }

        Ok(Self(user_id.to_string()))
    }
}
