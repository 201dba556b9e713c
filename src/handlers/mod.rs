pub mod auth_handlers;
pub mod health_handlers;
pub mod order_handlers;
pub mod page_handlers;
pub mod webhook_handlers;

pub use auth_handlers::signout_handler;
pub use health_handlers::{csrf_token_handler, health_handler};
pub use order_handlers::{get_order_handler, list_orders_handler};
pub use page_handlers::{dashboard_index, dashboard_page, landing_page, shop_index, shop_page};
pub use webhook_handlers::polar_webhook_handler;
