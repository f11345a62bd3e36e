//! Sync handlers: status, forced reconciliation, connectivity.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ConnectivityRequest, SyncStatusResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, LedgerError};
use crate::identity::IdentityProvider;
use crate::sync::SyncOutcome;

fn status_of(state: &AppState) -> SyncStatusResponse {
    SyncStatusResponse {
        phase: state.sync().phase(),
        online: state.session.identity().is_online(),
        state: state.sync().status(),
    }
}

/// `GET /sync/status`: Current sync indicator.
#[utoipa::path(
    get,
    path = "/api/v1/sync/status",
    tag = "Sync",
    summary = "Sync status",
    description = "Phase, connectivity, last sync time, and last error.",
    responses(
        (status = 200, description = "Sync status", body = SyncStatusResponse),
    )
)]
pub async fn sync_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(status_of(&state))
}

/// `POST /sync`: Reconcile now.
///
/// # Errors
///
/// Returns [`LedgerError::NotAuthenticated`] when nobody is signed in.
/// Every other problem is reported in the outcome.
#[utoipa::path(
    post,
    path = "/api/v1/sync",
    tag = "Sync",
    summary = "Force a sync",
    description = "Skips the debounce window and the minimum interval guard. Returns `already_in_progress` when another reconciliation is running.",
    responses(
        (status = 200, description = "Sync outcome", body = SyncOutcome),
        (status = 401, description = "No user signed in", body = ErrorResponse),
    )
)]
pub async fn force_sync(State(state): State<AppState>) -> Result<impl IntoResponse, LedgerError> {
    Ok(Json(state.sync().force_sync().await?))
}

/// `POST /sync/connectivity`: Report a connectivity change.
#[utoipa::path(
    post,
    path = "/api/v1/sync/connectivity",
    tag = "Sync",
    summary = "Set connectivity",
    description = "Going back online with changes made while offline schedules a sync.",
    request_body = ConnectivityRequest,
    responses(
        (status = 200, description = "Sync status after the change", body = SyncStatusResponse),
    )
)]
pub async fn set_connectivity(
    State(state): State<AppState>,
    Json(req): Json<ConnectivityRequest>,
) -> impl IntoResponse {
    state.session.set_online(req.online);
    Json(status_of(&state))
}

/// Sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(force_sync))
        .route("/sync/status", get(sync_status))
        .route("/sync/connectivity", post(set_connectivity))
}
