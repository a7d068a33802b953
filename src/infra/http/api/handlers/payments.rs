use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use bytes::Bytes;

use crate::application::payments::SIGNATURE_HEADER;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::WebhookAck;
use crate::infra::http::api::state::ApiState;

use super::webhook_to_api;

/// Payment provider callback. The raw body is verified before it is parsed,
/// so it must reach the service untouched.
pub async fn payment_webhook(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    state
        .payments
        .handle_webhook(signature, &body)
        .await
        .map_err(webhook_to_api)?;

    Ok(Json(WebhookAck { received: true }))
}
