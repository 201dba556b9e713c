pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

use middleware::{CsrfConfig, RateLimiter};
use repositories::OrderRepository;
use services::WebhookService;

#[derive(Clone)]
pub struct AppState {
    pub csrf: Arc<CsrfConfig>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub order_repository: Arc<dyn OrderRepository>,
    pub webhook_service: Arc<WebhookService>,
    /// Bearer token for operator endpoints; `None` disables them.
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        csrf: CsrfConfig,
        rate_limiter: Arc<dyn RateLimiter>,
        order_repository: Arc<dyn OrderRepository>,
        webhook_secret: Option<String>,
    ) -> Self {
        let webhook_service = Arc::new(WebhookService::new(
            webhook_secret,
            order_repository.clone(),
        ));

        Self {
            csrf: Arc::new(csrf),
            rate_limiter,
            order_repository,
            webhook_service,
            admin_token: None,
        }
    }

    pub fn with_admin_token(mut self, admin_token: Option<String>) -> Self {
        self.admin_token = admin_token.map(Arc::from);
        self
    }
}
