use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::repositories::RepositoryError;

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Build the JSON error envelope shared by every failing endpoint.
///
/// Body shape is `{ "message": ..., "error": CODE }`.
pub fn error_body(status: StatusCode, code: &str, message: &str) -> Response {
    let body = json!({
        "message": message,
        "error": code,
    });

    (status, Json(body)).into_response()
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error")]
    InternalError,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::PermissionDenied => "PERMISSION_DENIED",
            AppError::OrderNotFound => "ORDER_NOT_FOUND",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Database(_)
            | AppError::Repository(_)
            | AppError::Session(_)
            | AppError::InternalError => "SERVER_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        match self {
            AppError::PermissionDenied => {
                error_body(StatusCode::FORBIDDEN, code, "Permission denied")
            }
            AppError::OrderNotFound => error_body(StatusCode::NOT_FOUND, code, "Order not found"),
            AppError::RateLimited { retry_after_secs } => {
                let mut response = error_body(
                    StatusCode::TOO_MANY_REQUESTS,
                    code,
                    "Too many requests, please try again later",
                );
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            AppError::Validation(msg) => error_body(StatusCode::BAD_REQUEST, code, &msg),
            other => {
                error!("Request failed: {}", other);
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    code,
                    "Internal server error",
                )
            }
        }
    }
}

/// CSRF validation failures
#[derive(Debug, Error)]
pub enum CsrfError {
    #[error("CSRF token missing")]
    TokenMissing,

    #[error("Invalid CSRF token")]
    TokenInvalid,

    #[error("Request body could not be read")]
    UnreadableBody,

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl CsrfError {
    pub fn code(&self) -> &'static str {
        match self {
            CsrfError::TokenMissing => "TOKEN_MISSING",
            CsrfError::TokenInvalid => "TOKEN_INVALID",
            CsrfError::UnreadableBody => "INVALID_BODY",
            CsrfError::Session(_) => "SERVER_ERROR",
        }
    }
}

impl IntoResponse for CsrfError {
    fn into_response(self) -> Response {
        let code = self.code();
        match self {
            CsrfError::TokenMissing => {
                error_body(StatusCode::FORBIDDEN, code, "CSRF token missing")
            }
            CsrfError::TokenInvalid => {
                error_body(StatusCode::FORBIDDEN, code, "Invalid CSRF token")
            }
            CsrfError::UnreadableBody => {
                error_body(StatusCode::BAD_REQUEST, code, "Request body could not be read")
            }
            CsrfError::Session(e) => {
                error!("Session store failure during CSRF check: {}", e);
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    code,
                    "Internal server error",
                )
            }
        }
    }
}

/// Payment webhook errors
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook secret is not configured")]
    SecretNotConfigured,

    #[error("Missing or invalid webhook signature")]
    InvalidSignature,

    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Checkout event without an id")]
    MissingCheckoutId,

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            WebhookError::InvalidSignature => error_body(
                StatusCode::BAD_REQUEST,
                "INVALID_SIGNATURE",
                "Invalid webhook signature",
            ),
            WebhookError::MalformedPayload(ref e) => error_body(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                &format!("Malformed webhook payload: {}", e),
            ),
            WebhookError::MissingCheckoutId => error_body(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Checkout event without an id",
            ),
            other => {
                error!("Webhook processing failed: {}", other);
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERVER_ERROR",
                    "Webhook processing failed",
                )
            }
        }
    }
}

/// Configuration errors raised at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not a valid value: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Production environment requires HTTPS. Set FORCE_HTTPS=true")]
    HttpsRequired,

    #[error("SESSION_SECRET must be set in production")]
    MissingSessionSecret,

    #[error("SESSION_SECRET must be at least 64 bytes in production")]
    SessionSecretTooShort,

    #[error("SESSION_SECRET appears to be a default value")]
    DefaultSessionSecret,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn csrf_errors_render_forbidden_envelope() {
        let response = CsrfError::TokenMissing.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "TOKEN_MISSING");
        assert_eq!(body["message"], "CSRF token missing");
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after_secs: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn internal_errors_share_server_error_code() {
        assert_eq!(AppError::InternalError.code(), "SERVER_ERROR");
        assert_eq!(AppError::OrderNotFound.code(), "ORDER_NOT_FOUND");
        assert_eq!(AppError::PermissionDenied.code(), "PERMISSION_DENIED");
    }
}
