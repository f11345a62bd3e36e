//! Sync DTOs: status and connectivity.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{SyncPhase, SyncState};

/// Response body for `GET /sync/status` and `POST /sync/connectivity`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    /// Current scheduling phase.
    pub phase: SyncPhase,
    /// Whether the remote store is believed reachable.
    pub online: bool,
    /// Persisted sync indicator.
    pub state: SyncState,
}

/// Request body for `POST /sync/connectivity`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConnectivityRequest {
    /// New connectivity.
    pub online: bool,
}
