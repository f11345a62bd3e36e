//! Group DTOs for create, update, and list operations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::{Group, RecordId};

/// Request body for `POST /groups` and `PUT /groups/{id}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    /// Display name.
    pub name: String,
    /// Currency code (e.g. `"EUR"`).
    pub currency: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: String,
    /// Participant display names.
    pub participants: Vec<String>,
}

impl GroupRequest {
    /// Builds an unsaved group from the request.
    #[must_use]
    pub fn into_group(self) -> Group {
        Group::new(self.name, self.currency, self.participants).with_description(self.description)
    }
}

/// Paginated list response for `GET /groups`.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupListResponse {
    /// Groups on this page.
    pub data: Vec<Group>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Request body for `PUT /active-group`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGroupRequest {
    /// Group to activate.
    pub group_id: RecordId,
}

/// Response body for `GET /active-group`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGroupResponse {
    /// The active group, or `null` when none is set.
    pub active_group: Option<Group>,
}
