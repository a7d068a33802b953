//! Payment-provider webhook boundary.
//!
//! Events arrive signed with a shared secret. The `Stripe-Signature` header
//! carries the signing timestamp and one or more `v1` HMAC-SHA256 digests of
//! `"{timestamp}.{raw body}"`. Nothing is read from the payload until one of
//! the digests matches.

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use metrics::counter;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::repos::{RepoError, UsersRepo};

const TARGET: &str = "topzonal::payments";
pub const METRIC_REJECTED: &str = "topzonal_webhook_rejected_total";
pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
const EXTERNAL_ID_METADATA_KEY: &str = "clerkId";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing")]
    MissingHeader,
    #[error("signature header is malformed")]
    MalformedHeader,
    #[error("no signature matches the payload")]
    Mismatch,
    #[error("signature timestamp is outside the tolerance window")]
    StaleTimestamp,
    #[error("payload is not a valid event: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook secret is not configured")]
    NotConfigured,
    #[error("webhook signature rejected: {0}")]
    SignatureInvalid(#[from] SignatureError),
    #[error("checkout session carries no `clerkId` metadata")]
    MissingMetadata,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    EntitlementGranted {
        external_id: String,
        until: OffsetDateTime,
    },
    /// The event referenced a user this service has never seen.
    UnknownUser { external_id: String },
    Ignored { event_type: String },
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

#[derive(Clone)]
pub struct PaymentService {
    users: Arc<dyn UsersRepo>,
    secret: Option<String>,
    tolerance: Duration,
    entitlement: time::Duration,
}

impl PaymentService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        secret: Option<String>,
        tolerance: Duration,
        entitlement_days: u32,
    ) -> Self {
        Self {
            users,
            secret,
            tolerance,
            entitlement: time::Duration::days(i64::from(entitlement_days)),
        }
    }

    pub async fn handle_webhook(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookOutcome, WebhookError> {
        self.handle_webhook_at(OffsetDateTime::now_utc(), signature, body)
            .await
    }

    pub async fn handle_webhook_at(
        &self,
        now: OffsetDateTime,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookOutcome, WebhookError> {
        let secret = self.secret.as_deref().ok_or(WebhookError::NotConfigured)?;

        let event = match verify_and_parse(secret, signature, body, now, self.tolerance) {
            Ok(event) => event,
            Err(err) => {
                counter!(METRIC_REJECTED, "reason" => "signature").increment(1);
                warn!(target: TARGET, error = %err, "Rejected webhook signature");
                return Err(err.into());
            }
        };

        if event.event_type != CHECKOUT_COMPLETED {
            info!(target: TARGET, event_type = %event.event_type, "Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored {
                event_type: event.event_type,
            });
        }

        let Some(external_id) = external_id_from(&event.data.object) else {
            counter!(METRIC_REJECTED, "reason" => "metadata").increment(1);
            warn!(target: TARGET, "Checkout session without user metadata");
            return Err(WebhookError::MissingMetadata);
        };

        let until = now + self.entitlement;
        match self.users.grant_premium(&external_id, until).await? {
            Some(user) => {
                info!(
                    target: TARGET,
                    external_id = %external_id,
                    premium_until = ?user.premium_until,
                    "Payment successful, premium granted"
                );
                Ok(WebhookOutcome::EntitlementGranted { external_id, until })
            }
            None => {
                warn!(
                    target: TARGET,
                    external_id = %external_id,
                    "Payment for unknown user acknowledged without entitlement"
                );
                Ok(WebhookOutcome::UnknownUser { external_id })
            }
        }
    }
}

fn verify_and_parse(
    secret: &str,
    signature: Option<&str>,
    body: &[u8],
    now: OffsetDateTime,
    tolerance: Duration,
) -> Result<WebhookEvent, SignatureError> {
    let header = signature.ok_or(SignatureError::MissingHeader)?;
    verify_signature(secret, header, body, now, tolerance)?;
    serde_json::from_slice(body).map_err(|err| SignatureError::MalformedPayload(err.to_string()))
}

fn external_id_from(object: &serde_json::Value) -> Option<String> {
    object
        .get("metadata")?
        .get(EXTERNAL_ID_METADATA_KEY)?
        .as_str()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Check a `t=<unix>,v1=<hex>[,v1=<hex>...]` header against `body`.
pub fn verify_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    now: OffsetDateTime,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                let parsed = value
                    .parse::<i64>()
                    .map_err(|_| SignatureError::MalformedHeader)?;
                timestamp = Some(parsed);
            }
            // Undecodable digests can never match; skip them.
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    candidates.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let expected = digest(secret, timestamp, body)?;
    let matched = candidates
        .iter()
        .any(|candidate| bool::from(expected.as_slice().ct_eq(candidate.as_slice())));
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    let age = now.unix_timestamp().saturating_sub(timestamp);
    if age > i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX) {
        return Err(SignatureError::StaleTimestamp);
    }

    Ok(())
}

/// Build a signature header for `body` the way the payment provider does.
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let signature = digest(secret, timestamp, body).map(hex::encode).unwrap_or_default();
    format!("t={timestamp},v1={signature}")
}

fn digest(secret: &str, timestamp: i64, body: &[u8]) -> Result<Vec<u8>, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_760_000_000).unwrap()
    }

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let header = sign_payload(SECRET, now().unix_timestamp(), body);
        assert_eq!(
            verify_signature(SECRET, &header, body, now(), Duration::from_secs(300)),
            Ok(())
        );
    }

    #[test]
    fn any_matching_v1_is_enough() {
        let body = b"{}";
        let good = sign_payload(SECRET, now().unix_timestamp(), body);
        let digest = good.split_once("v1=").unwrap().1;
        let header = format!("t={},v1=deadbeef,v1={digest}", now().unix_timestamp());
        assert!(verify_signature(SECRET, &header, body, now(), Duration::from_secs(300)).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign_payload(SECRET, now().unix_timestamp(), b"{\"a\":1}");
        assert_eq!(
            verify_signature(SECRET, &header, b"{\"a\":2}", now(), Duration::from_secs(300)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_other_secret() {
        let header = sign_payload("whsec_other", now().unix_timestamp(), b"{}");
        assert_eq!(
            verify_signature(SECRET, &header, b"{}", now(), Duration::from_secs(300)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let signed_at = now().unix_timestamp() - 301;
        let header = sign_payload(SECRET, signed_at, b"{}");
        assert_eq!(
            verify_signature(SECRET, &header, b"{}", now(), Duration::from_secs(300)),
            Err(SignatureError::StaleTimestamp)
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        for header in ["", "v1=abcd", "t=abc,v1=abcd", "t=1760000000"] {
            assert_eq!(
                verify_signature(SECRET, header, b"{}", now(), Duration::from_secs(300)),
                Err(SignatureError::MalformedHeader),
                "header `{header}`"
            );
        }
    }

    #[test]
    fn extracts_external_id_from_metadata() {
        let object = serde_json::json!({ "metadata": { "clerkId": "user_placeholder_2" } });
        assert_eq!(
            external_id_from(&object).as_deref(),
            Some("user_placeholder_2")
        );
        assert_eq!(external_id_from(&serde_json::json!({ "metadata": {} })), None);
        assert_eq!(
            external_id_from(&serde_json::json!({ "metadata": { "clerkId": "" } })),
            None
        );
    }
}
