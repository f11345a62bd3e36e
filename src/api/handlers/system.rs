//! System endpoints: health check and session info.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::error::{ErrorResponse, LedgerError};
use crate::identity::IdentityProvider;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// Signed-in user and connectivity.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    user_id: String,
    remote_owner_id: String,
    online: bool,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /session`: Who is signed in.
///
/// # Errors
///
/// Returns [`LedgerError::NotAuthenticated`] when nobody is signed in.
#[utoipa::path(
    get,
    path = "/session",
    tag = "System",
    summary = "Current session",
    description = "Local user id, the id partitioning the remote store, and connectivity.",
    responses(
        (status = 200, description = "Signed-in user", body = SessionResponse),
        (status = 401, description = "No user signed in", body = ErrorResponse),
    )
)]
pub async fn session_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, LedgerError> {
    let identity = state.session.identity();
    let user = identity.current_user().ok_or(LedgerError::NotAuthenticated)?;
    Ok(Json(SessionResponse {
        remote_owner_id: user.remote_owner_id().to_string(),
        user_id: user.id,
        online: identity.is_online(),
    }))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/session", get(session_handler))
}
