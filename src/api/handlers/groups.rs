//! Group handlers: CRUD, group expenses, and settlement queries.
//!
//! Every successful read under `/groups` counts as a view activation and
//! requests a navigation-triggered sync.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    BalancesResponse, ExpenseListResponse, ExpenseRequest, GroupListResponse, GroupRequest,
    PaginationParams, SettlementResponse,
};
use crate::app_state::AppState;
use crate::domain::{Expense, Group, RecordId};
use crate::error::{ErrorResponse, LedgerError};
use crate::service::GroupSummary;

/// `GET /groups`: List groups.
///
/// # Errors
///
/// Returns [`LedgerError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/groups",
    tag = "Groups",
    summary = "List groups",
    description = "Returns a paginated list of the user's groups in storage order.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated group list", body = GroupListResponse),
        (status = 401, description = "No user signed in", body = ErrorResponse),
    )
)]
pub async fn list_groups(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, LedgerError> {
    let groups = state.service().list_groups().await?;
    let (data, pagination) = params.paginate(groups);
    state.sync().notify_navigation();
    Ok(Json(GroupListResponse { data, pagination }))
}

/// `POST /groups`: Create a group.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] for an invalid group.
#[utoipa::path(
    post,
    path = "/api/v1/groups",
    tag = "Groups",
    summary = "Create a group",
    description = "Validates and stores a new group. The id and creation stamps are assigned by the server.",
    request_body = GroupRequest,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 400, description = "Invalid group", body = ErrorResponse),
    )
)]
pub async fn create_group(
    State(state): State<AppState>,
    Json(req): Json<GroupRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    let group = state.service().create_group(req.into_group()).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// `GET /groups/{id}`: Get one group.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] if the group does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}",
    tag = "Groups",
    summary = "Get a group",
    params(("id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group", body = Group),
        (status = 404, description = "Group not found", body = ErrorResponse),
    )
)]
pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<impl IntoResponse, LedgerError> {
    let group = state.service().get_group(&id).await?;
    state.sync().notify_navigation();
    Ok(Json(group))
}

/// `PUT /groups/{id}`: Replace a group.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] or [`LedgerError::Validation`].
#[utoipa::path(
    put,
    path = "/api/v1/groups/{id}",
    tag = "Groups",
    summary = "Update a group",
    description = "Replaces name, currency, description and participants. Existing expenses are not re-validated.",
    params(("id" = String, Path, description = "Group id")),
    request_body = GroupRequest,
    responses(
        (status = 200, description = "Updated group", body = Group),
        (status = 400, description = "Invalid group", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
    )
)]
pub async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    Json(req): Json<GroupRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    let group = state.service().update_group(&id, req.into_group()).await?;
    Ok(Json(group))
}

/// `DELETE /groups/{id}`: Delete a group and its expenses.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] if the group does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/groups/{id}",
    tag = "Groups",
    summary = "Delete a group",
    description = "Deletes the group, every expense in it, and the active-group pointer if it referenced the group.",
    params(("id" = String, Path, description = "Group id")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 404, description = "Group not found", body = ErrorResponse),
    )
)]
pub async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<impl IntoResponse, LedgerError> {
    state.service().delete_group(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /groups/{id}/expenses`: List the expenses of a group.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] if the group does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}/expenses",
    tag = "Groups",
    summary = "List group expenses",
    params(
        ("id" = String, Path, description = "Group id"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated expense list", body = ExpenseListResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
    )
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, LedgerError> {
    let expenses = state.service().list_expenses(&id).await?;
    let (data, pagination) = params.paginate(expenses);
    state.sync().notify_navigation();
    Ok(Json(ExpenseListResponse { data, pagination }))
}

/// `POST /groups/{id}/expenses`: Add an expense to a group.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] or [`LedgerError::Validation`].
#[utoipa::path(
    post,
    path = "/api/v1/groups/{id}/expenses",
    tag = "Groups",
    summary = "Create an expense",
    description = "Validates the expense against the group's participants and stores it.",
    params(("id" = String, Path, description = "Group id")),
    request_body = ExpenseRequest,
    responses(
        (status = 201, description = "Expense created", body = Expense),
        (status = 400, description = "Invalid expense", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
    )
)]
pub async fn create_expense(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    Json(req): Json<ExpenseRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    let expense = req.into_expense(id.clone());
    let expense = state.service().create_expense(&id, expense).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// `GET /groups/{id}/balances`: Net balance per participant.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] if the group does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}/balances",
    tag = "Settlement",
    summary = "Group balances",
    description = "Positive balances are owed to the participant; settled expenses are ignored.",
    params(("id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Balances", body = BalancesResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
    )
)]
pub async fn balances(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<impl IntoResponse, LedgerError> {
    let balances = state.service().calculate_balances(&id).await?;
    state.sync().notify_navigation();
    Ok(Json(BalancesResponse {
        group_id: id,
        balances: balances.as_slice().to_vec(),
    }))
}

/// `GET /groups/{id}/settlement`: Transfers that settle the group.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] if the group does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}/settlement",
    tag = "Settlement",
    summary = "Settlement plan",
    description = "Greedy netting of the group's balances into at most participants - 1 transfers.",
    params(("id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Settlement plan", body = SettlementResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
    )
)]
pub async fn settlement(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<impl IntoResponse, LedgerError> {
    let transfers = state.service().settle(&id).await?;
    state.sync().notify_navigation();
    Ok(Json(SettlementResponse {
        group_id: id,
        transfer_count: transfers.len(),
        transfers,
    }))
}

/// `GET /groups/{id}/summary`: Totals, balances and settlement.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] if the group does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}/summary",
    tag = "Settlement",
    summary = "Group summary",
    params(("id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group summary", body = GroupSummary),
        (status = 404, description = "Group not found", body = ErrorResponse),
    )
)]
pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<impl IntoResponse, LedgerError> {
    let summary = state.service().group_summary(&id).await?;
    state.sync().notify_navigation();
    Ok(Json(summary))
}

/// Group routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route(
            "/groups/{id}",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route(
            "/groups/{id}/expenses",
            get(list_expenses).post(create_expense),
        )
        .route("/groups/{id}/balances", get(balances))
        .route("/groups/{id}/settlement", get(settlement))
        .route("/groups/{id}/summary", get(summary))
}
