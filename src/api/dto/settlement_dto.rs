//! Settlement DTOs: balances and transfer plans.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ParticipantBalance, RecordId, Transfer};

/// Response body for `GET /groups/{id}/balances`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalancesResponse {
    /// Group the balances belong to.
    pub group_id: RecordId,
    /// Net balance per participant, in participant order.
    pub balances: Vec<ParticipantBalance>,
}

/// Response body for `GET /groups/{id}/settlement`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    /// Group the plan belongs to.
    pub group_id: RecordId,
    /// Transfers that zero every balance.
    pub transfers: Vec<Transfer>,
    /// Number of transfers.
    pub transfer_count: usize,
}
