pub mod order;
pub mod webhook;

pub use order::{CheckoutDetails, Order, OrderStatus};
pub use webhook::WebhookEvent;
