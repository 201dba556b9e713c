use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde_json::{json, Value};

use crate::{error::WebhookError, services::webhook_service::SIGNATURE_HEADER, AppState};

/// Receives payment provider events. Authenticated by HMAC signature, not CSRF.
pub async fn polar_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    state.webhook_service.handle(&body, signature).await?;

    Ok(Json(json!({ "received": true })))
}
