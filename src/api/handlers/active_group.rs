//! Active-group pointer handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ActiveGroupRequest, ActiveGroupResponse};
use crate::app_state::AppState;
use crate::domain::Group;
use crate::error::{ErrorResponse, LedgerError};

/// `GET /active-group`: Current active group.
///
/// # Errors
///
/// Returns [`LedgerError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/active-group",
    tag = "Active group",
    summary = "Get the active group",
    responses(
        (status = 200, description = "Active group or null", body = ActiveGroupResponse),
    )
)]
pub async fn get_active(State(state): State<AppState>) -> Result<impl IntoResponse, LedgerError> {
    let active_group = state.service().active_group().await?;
    Ok(Json(ActiveGroupResponse { active_group }))
}

/// `PUT /active-group`: Activate a group.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] if the group does not exist.
#[utoipa::path(
    put,
    path = "/api/v1/active-group",
    tag = "Active group",
    summary = "Set the active group",
    request_body = ActiveGroupRequest,
    responses(
        (status = 200, description = "Activated group", body = Group),
        (status = 404, description = "Group not found", body = ErrorResponse),
    )
)]
pub async fn set_active(
    State(state): State<AppState>,
    Json(req): Json<ActiveGroupRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    Ok(Json(state.service().set_active_group(&req.group_id).await?))
}

/// `DELETE /active-group`: Clear the pointer.
///
/// # Errors
///
/// Returns [`LedgerError`] on storage failure.
#[utoipa::path(
    delete,
    path = "/api/v1/active-group",
    tag = "Active group",
    summary = "Clear the active group",
    responses(
        (status = 204, description = "Pointer cleared"),
    )
)]
pub async fn clear_active(State(state): State<AppState>) -> Result<impl IntoResponse, LedgerError> {
    state.service().clear_active_group().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Active-group routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/active-group",
        get(get_active).put(set_active).delete(clear_active),
    )
}
