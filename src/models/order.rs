use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle of a checkout as reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Completed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub checkout_id: String,
    pub status: String,
    pub customer_email: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields recorded when a checkout changes state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutDetails {
    pub customer_email: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}
