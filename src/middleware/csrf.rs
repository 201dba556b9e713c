use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use subtle::ConstantTimeEq;
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::{error::CsrfError, AppState};

pub const CSRF_TOKEN_KEY: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";
/// Body fields accepted when the header is absent, in lookup order.
pub const CSRF_BODY_FIELDS: [&str; 2] = ["_csrf", "csrf_token"];

const TOKEN_BYTES: usize = 32;
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// CSRF Token structure for session storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfToken {
    pub value: String,
    pub created_at: i64,
}

impl CsrfToken {
    /// Create a new token from 256 bits of OS randomness
    pub fn new() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);

        Self {
            value: hex::encode(bytes),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Tokens without a TTL never expire.
    pub fn is_expired(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => {
                let age = chrono::Utc::now().timestamp() - self.created_at;
                age > ttl.as_secs() as i64
            }
            None => false,
        }
    }
}

impl Default for CsrfToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Token handed to handlers of safe requests through request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCsrfToken(pub String);

/// Per-deployment CSRF settings.
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    pub token_ttl: Option<Duration>,
    /// Path prefixes whose callers authenticate by other means.
    pub exempt_prefixes: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_ttl: None,
            exempt_prefixes: vec!["/api/webhooks/".to_string()],
        }
    }
}

impl CsrfConfig {
    pub fn with_ttl(token_ttl: Option<Duration>) -> Self {
        Self {
            token_ttl,
            ..Self::default()
        }
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.exempt_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn short(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

/// Generate a new CSRF token and store in session
pub async fn generate_csrf_token(session: &Session) -> Result<String, CsrfError> {
    let token = CsrfToken::new();
    let value = token.value.clone();

    session.insert(CSRF_TOKEN_KEY, token).await?;

    debug!("Generated new CSRF token: {}", short(&value));
    Ok(value)
}

/// Return the session's token, creating one if it has none or it expired
pub async fn ensure_token(session: &Session, ttl: Option<Duration>) -> Result<String, CsrfError> {
    let token: Option<CsrfToken> = session.get(CSRF_TOKEN_KEY).await?;

    match token {
        Some(existing) if !existing.is_expired(ttl) => Ok(existing.value),
        _ => generate_csrf_token(session).await,
    }
}

/// Compare a client supplied token against the session's token
pub async fn validate(
    session: &Session,
    provided: Option<&str>,
    ttl: Option<Duration>,
) -> Result<(), CsrfError> {
    let provided = match provided.filter(|token| !token.is_empty()) {
        Some(token) => token,
        None => return Err(CsrfError::TokenMissing),
    };

    let stored: CsrfToken = match session.get(CSRF_TOKEN_KEY).await? {
        Some(token) => token,
        None => {
            warn!("No CSRF token in session");
            return Err(CsrfError::TokenInvalid);
        }
    };

    if stored.is_expired(ttl) {
        warn!("CSRF token expired");
        return Err(CsrfError::TokenInvalid);
    }

    if !bool::from(stored.value.as_bytes().ct_eq(provided.as_bytes())) {
        warn!(
            "CSRF token mismatch: expected {}, got {}",
            short(&stored.value),
            short(provided)
        );
        return Err(CsrfError::TokenInvalid);
    }

    Ok(())
}

/// Drop the session's token; the next safe request issues a fresh one
pub async fn invalidate_token(session: &Session) -> Result<(), CsrfError> {
    session.remove::<CsrfToken>(CSRF_TOKEN_KEY).await?;
    Ok(())
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Pull `_csrf` / `csrf_token` out of a JSON or urlencoded body
pub fn token_from_body(content_type: Option<&str>, body: &[u8]) -> Option<String> {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        let value: Value = serde_json::from_slice(body).ok()?;
        return CSRF_BODY_FIELDS.iter().find_map(|field| {
            value
                .get(*field)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(String::from)
        });
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body).ok()?;
        return CSRF_BODY_FIELDS.iter().find_map(|field| {
            pairs
                .iter()
                .find(|(key, value)| key == field && !value.is_empty())
                .map(|(_, value)| value.clone())
        });
    }

    None
}

/// Issue tokens on safe requests and enforce them on state-changing ones.
///
/// Safe requests get the session token in their extensions and in the
/// `x-csrf-token` response header. Unsafe requests must echo the token in
/// that header or in a `_csrf` / `csrf_token` body field.
pub async fn csrf_middleware(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, CsrfError> {
    let ttl = state.csrf.token_ttl;

    if is_safe_method(request.method()) {
        let token = ensure_token(&session, ttl).await?;
        request
            .extensions_mut()
            .insert(IssuedCsrfToken(token.clone()));

        let mut response = next.run(request).await;
        if let Ok(value) = HeaderValue::from_str(&token) {
            response.headers_mut().insert(CSRF_HEADER, value);
        }
        return Ok(response);
    }

    let path = request.uri().path().to_string();
    if state.csrf.is_exempt(&path) {
        return Ok(next.run(request).await);
    }

    debug!("Validating CSRF for {} {}", request.method(), path);

    // Header takes precedence; the body is only buffered when it is needed.
    let (provided, request) = match header_token(request.headers()) {
        Some(token) => (Some(token), request),
        None => {
            let (parts, body) = request.into_parts();
            let bytes = to_bytes(body, MAX_BODY_BYTES)
                .await
                .map_err(|_| CsrfError::UnreadableBody)?;
            let content_type = parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let token = token_from_body(content_type, &bytes);
            (token, Request::from_parts(parts, Body::from(bytes)))
        }
    };

    if let Err(err) = validate(&session, provided.as_deref(), ttl).await {
        warn!("CSRF validation failed for {}: {}", path, err);
        return Err(err);
    }

    Ok(next.run(request).await)
}
