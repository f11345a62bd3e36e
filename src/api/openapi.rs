//! OpenAPI document for the REST surface.

use axum::Router;
#[cfg(not(feature = "swagger-ui"))]
use axum::{Json, routing::get};
use utoipa::OpenApi;

use crate::api::dto::{
    ActiveGroupRequest, ActiveGroupResponse, BalancesResponse, ConnectivityRequest,
    ExpenseListResponse, ExpenseRequest, GroupListResponse, GroupRequest, PaginationMeta,
    SettlementResponse, SyncStatusResponse,
};
use crate::api::handlers::{active_group, expenses, groups, sync, system};
use crate::app_state::AppState;
use crate::domain::{
    Expense, Group, ParticipantBalance, RecordId, SyncPhase, SyncState, SyncStatus, Transfer,
};
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::GroupSummary;
use crate::sync::{ReconcileReport, SkipReason, SyncOutcome};

/// Generated OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "split-ledger", description = "Local-first shared expense ledger"),
    paths(
        groups::list_groups,
        groups::create_group,
        groups::get_group,
        groups::update_group,
        groups::delete_group,
        groups::list_expenses,
        groups::create_expense,
        groups::balances,
        groups::settlement,
        groups::summary,
        expenses::get_expense,
        expenses::update_expense,
        expenses::delete_expense,
        active_group::get_active,
        active_group::set_active,
        active_group::clear_active,
        sync::sync_status,
        sync::force_sync,
        sync::set_connectivity,
        system::health_handler,
        system::session_handler,
    ),
    components(schemas(
        RecordId,
        Group,
        Expense,
        ParticipantBalance,
        Transfer,
        GroupSummary,
        SyncStatus,
        SyncPhase,
        SyncState,
        SyncOutcome,
        SkipReason,
        ReconcileReport,
        GroupRequest,
        GroupListResponse,
        ActiveGroupRequest,
        ActiveGroupResponse,
        ExpenseRequest,
        ExpenseListResponse,
        BalancesResponse,
        SettlementResponse,
        SyncStatusResponse,
        ConnectivityRequest,
        PaginationMeta,
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
        system::SessionResponse,
    )),
    tags(
        (name = "Groups", description = "Groups and their expenses"),
        (name = "Expenses", description = "Expenses addressed by id"),
        (name = "Settlement", description = "Balances and settlement plans"),
        (name = "Active group", description = "Current group pointer"),
        (name = "Sync", description = "Remote reconciliation"),
        (name = "System", description = "Health and session"),
    )
)]
pub struct ApiDoc;

#[cfg(not(feature = "swagger-ui"))]
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Serves the document at `/api-docs/openapi.json`, plus Swagger UI at
/// `/swagger-ui` when the `swagger-ui` feature is enabled.
pub fn routes() -> Router<AppState> {
    let router = Router::new();
    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route("/api-docs/openapi.json", get(openapi_json));
    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/groups",
            "/api/v1/groups/{id}",
            "/api/v1/groups/{id}/expenses",
            "/api/v1/groups/{id}/settlement",
            "/api/v1/expenses/{id}",
            "/api/v1/active-group",
            "/api/v1/sync",
            "/api/v1/sync/status",
            "/api/v1/sync/connectivity",
            "/health",
            "/session",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
