//! Client-side CSRF token cache.
//!
//! Fetches the token the server exposes on safe requests and replays it on
//! mutating ones. The underlying HTTP client keeps a cookie jar so the
//! session cookie that binds the token is sent back as well.

use reqwest::{Client, RequestBuilder};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::middleware::csrf::CSRF_HEADER;

pub const HEALTH_PATH: &str = "/api/health";

#[derive(Debug, thiserror::Error)]
pub enum CsrfClientError {
    #[error("Token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Response did not carry an x-csrf-token header")]
    MissingHeader,
}

pub struct CsrfTokenClient {
    http: Client,
    token_url: String,
    cached: Mutex<Option<String>>,
}

impl CsrfTokenClient {
    pub fn new(base_url: &str) -> Result<Self, CsrfClientError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Use a caller supplied client; it should keep cookies for the token to validate.
    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            token_url: format!("{}{}", base_url.trim_end_matches('/'), HEALTH_PATH),
            cached: Mutex::new(None),
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Cached token, fetching one when the cache is empty.
    ///
    /// The cache lock is held across the fetch, so concurrent callers wait
    /// for a single request instead of issuing their own.
    pub async fn try_get_token(&self) -> Result<String, CsrfClientError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let response = self.http.get(&self.token_url).send().await?;
        let token = response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(String::from)
            .ok_or(CsrfClientError::MissingHeader)?;

        debug!("Fetched CSRF token from {}", self.token_url);
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Fail-open variant of [`try_get_token`](Self::try_get_token).
    ///
    /// Returns an empty string on failure; the server then rejects the
    /// mutating request with `TOKEN_MISSING`.
    pub async fn get_token(&self) -> String {
        match self.try_get_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!("Could not obtain CSRF token: {}", err);
                String::new()
            }
        }
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.cached.lock().await = Some(token.into());
    }

    pub async fn clear_token(&self) {
        *self.cached.lock().await = None;
    }

    /// Adds the token header to a mutating request.
    pub async fn attach(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.get_token().await;
        if token.is_empty() {
            request
        } else {
            request.header(CSRF_HEADER, token)
        }
    }
}
