use axum::response::Json;
use serde_json::{json, Value};
use tower_sessions::Session;
use tracing::info;

use crate::error::Result;

/// Ends the session. Flushing deletes the stored CSRF token with it; the
/// next safe request issues a fresh one.
pub async fn signout_handler(session: Session) -> Result<Json<Value>> {
    session.flush().await?;

    info!("Session signed out");
    Ok(Json(json!({ "message": "Signed out" })))
}
