//! services/api/src/web/middleware.rs
//!
//! Key-gate middleware for protecting the report endpoint.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::state::AppState;

/// Middleware that checks the anonymous service key on incoming requests.
///
/// The key is an opaque collaborator-provided string; it is compared
/// byte-for-byte and never parsed. When no key is configured the gate is
/// open, which is the local-development mode.
pub async fn require_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());

    if provided == Some(expected) {
        Ok(next.run(req).await)
    } else {
        warn!("Rejected request with missing or mismatched x-api-key.");
        Err(StatusCode::UNAUTHORIZED)
    }
}
