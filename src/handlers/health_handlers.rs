use axum::{response::Json, Extension};
use serde_json::{json, Value};

use crate::middleware::IssuedCsrfToken;

/// Liveness probe; the CSRF middleware also attaches the session token here.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn csrf_token_handler(Extension(token): Extension<IssuedCsrfToken>) -> Json<Value> {
    Json(json!({ "csrfToken": token.0 }))
}
