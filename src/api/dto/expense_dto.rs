//! Expense DTOs for create, update, and list operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::{Expense, RecordId};

/// Request body for `POST /groups/{id}/expenses` and `PUT /expenses/{id}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRequest {
    /// Short description.
    pub title: String,
    /// Non-negative amount.
    pub amount: f64,
    /// Participant who paid.
    pub paid_by: String,
    /// Participants the amount is split across.
    pub participants: Vec<String>,
    /// Payment date; defaults to now.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Whether the expense is already settled.
    #[serde(default)]
    pub settled: bool,
    /// Optional category label.
    #[serde(default)]
    pub category: Option<String>,
}

impl ExpenseRequest {
    /// Builds an unsaved expense in `group_id` from the request.
    #[must_use]
    pub fn into_expense(self, group_id: RecordId) -> Expense {
        let mut expense = Expense::new(
            group_id,
            self.title,
            self.amount,
            self.paid_by,
            self.participants,
        )
        .settled(self.settled);
        if let Some(date) = self.date {
            expense.date = date;
        }
        expense.category = self.category;
        expense
    }
}

/// Paginated list response for `GET /groups/{id}/expenses`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ExpenseListResponse {
    /// Expenses on this page.
    pub data: Vec<Expense>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
