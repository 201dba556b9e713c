//! Payment provider webhook handling.
//!
//! Signatures are hex encoded HMAC-SHA256 digests of the raw request body,
//! keyed with the shared webhook secret and sent in the `polar-signature`
//! header. Only checkout completion and cancellation change state; every
//! other event type is acknowledged and ignored.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{info, warn};

use crate::error::WebhookError;
use crate::models::order::{Order, OrderStatus};
use crate::models::webhook::{WebhookEvent, CHECKOUT_CANCELED, CHECKOUT_COMPLETED};
use crate::repositories::OrderRepository;

pub const SIGNATURE_HEADER: &str = "polar-signature";

type HmacSha256 = Hmac<Sha256>;

/// Outcome of a processed event, used for logging and tests.
#[derive(Debug)]
pub enum WebhookOutcome {
    Updated(Order),
    Ignored(String),
}

pub struct WebhookService {
    secret: Option<String>,
    order_repository: Arc<dyn OrderRepository>,
}

impl WebhookService {
    pub fn new(secret: Option<String>, order_repository: Arc<dyn OrderRepository>) -> Self {
        Self {
            secret,
            order_repository,
        }
    }

    /// Checks `signature` against the HMAC of `payload` in constant time.
    pub fn verify_signature(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<(), WebhookError> {
        let secret = self
            .secret
            .as_deref()
            .ok_or(WebhookError::SecretNotConfigured)?;
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(WebhookError::InvalidSignature)?;
        let expected = hex::decode(signature).map_err(|_| WebhookError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| WebhookError::SecretNotConfigured)?;
        mac.update(payload);
        mac.verify_slice(&expected)
            .map_err(|_| WebhookError::InvalidSignature)
    }

    /// Verifies, parses and applies a raw webhook delivery.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, WebhookError> {
        if let Err(err) = self.verify_signature(payload, signature) {
            warn!("Rejected webhook delivery: {}", err);
            return Err(err);
        }

        let event: WebhookEvent = serde_json::from_slice(payload)?;
        self.process_event(event).await
    }

    pub async fn process_event(&self, event: WebhookEvent) -> Result<WebhookOutcome, WebhookError> {
        let status = match event.event_type.as_str() {
            CHECKOUT_COMPLETED => OrderStatus::Completed,
            CHECKOUT_CANCELED => OrderStatus::Canceled,
            other => {
                info!("Ignoring webhook event type {}", other);
                return Ok(WebhookOutcome::Ignored(other.to_string()));
            }
        };

        let checkout_id = event
            .checkout_id()
            .ok_or(WebhookError::MissingCheckoutId)?
            .to_string();

        let order = self
            .order_repository
            .upsert_status(&checkout_id, status, event.checkout_details())
            .await?;

        info!(
            checkout_id = %checkout_id,
            status = status.as_str(),
            "Recorded checkout event"
        );
        Ok(WebhookOutcome::Updated(order))
    }
}

/// Hex encoded signature for `payload`, as the provider would compute it.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::SecretNotConfigured)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
