use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::order::CheckoutDetails;

pub const CHECKOUT_COMPLETED: &str = "checkout.completed";
pub const CHECKOUT_CANCELED: &str = "checkout.canceled";

/// Envelope posted by the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

impl WebhookEvent {
    pub fn checkout_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    pub fn checkout_details(&self) -> CheckoutDetails {
        let customer_email = self
            .data
            .get("customer_email")
            .and_then(Value::as_str)
            .map(String::from);
        // Amounts arrive as integer minor units; some payloads nest them under `total_amount`.
        let amount = self
            .data
            .get("amount")
            .or_else(|| self.data.get("total_amount"))
            .and_then(Value::as_i64);
        let currency = self
            .data
            .get("currency")
            .and_then(Value::as_str)
            .map(String::from);

        CheckoutDetails {
            customer_email,
            amount,
            currency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_provider_payload() {
        let event: WebhookEvent = serde_json::from_value(json!({
            "type": "checkout.completed",
            "data": {
                "id": "chk_123",
                "customer_email": "buyer@example.com",
                "total_amount": 4200,
                "currency": "usd"
            }
        }))
        .unwrap();

        assert_eq!(event.event_type, CHECKOUT_COMPLETED);
        assert_eq!(event.checkout_id(), Some("chk_123"));
        assert_eq!(
            event.checkout_details(),
            CheckoutDetails {
                customer_email: Some("buyer@example.com".to_string()),
                amount: Some(4200),
                currency: Some("usd".to_string()),
            }
        );
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let event: WebhookEvent =
            serde_json::from_str(r#"{"type":"subscription.created"}"#).unwrap();
        assert!(event.checkout_id().is_none());
        assert_eq!(event.checkout_details(), CheckoutDetails::default());
    }
}
