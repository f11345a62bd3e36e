//! Expense handlers addressed by expense id.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::ExpenseRequest;
use crate::app_state::AppState;
use crate::domain::{Expense, RecordId};
use crate::error::{ErrorResponse, LedgerError};

/// `GET /expenses/{id}`: Get one expense.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] if the expense does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/expenses/{id}",
    tag = "Expenses",
    summary = "Get an expense",
    params(("id" = String, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense", body = Expense),
        (status = 404, description = "Expense not found", body = ErrorResponse),
    )
)]
pub async fn get_expense(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<impl IntoResponse, LedgerError> {
    Ok(Json(state.service().get_expense(&id).await?))
}

/// `PUT /expenses/{id}`: Replace an expense.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] or [`LedgerError::Validation`].
#[utoipa::path(
    put,
    path = "/api/v1/expenses/{id}",
    tag = "Expenses",
    summary = "Update an expense",
    description = "Replaces the expense fields. The expense stays in its group and is re-validated against it.",
    params(("id" = String, Path, description = "Expense id")),
    request_body = ExpenseRequest,
    responses(
        (status = 200, description = "Updated expense", body = Expense),
        (status = 400, description = "Invalid expense", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
    )
)]
pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    Json(req): Json<ExpenseRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    let expense = req.into_expense(RecordId::unassigned());
    Ok(Json(state.service().update_expense(&id, expense).await?))
}

/// `DELETE /expenses/{id}`: Delete an expense.
///
/// # Errors
///
/// Returns [`LedgerError::NotFound`] if the expense does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{id}",
    tag = "Expenses",
    summary = "Delete an expense",
    params(("id" = String, Path, description = "Expense id")),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 404, description = "Expense not found", body = ErrorResponse),
    )
)]
pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<impl IntoResponse, LedgerError> {
    state.service().delete_expense(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Expense routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/expenses/{id}",
        get(get_expense).put(update_expense).delete(delete_expense),
    )
}
