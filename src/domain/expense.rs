//! Single payment event inside a group.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::collection::{Collection, Record};
use super::CollectionSnapshot;
use super::{Group, RecordId};
use crate::error::LedgerError;

/// A payment made by `paid_by` and split evenly across `participants`.
///
/// Settled expenses stay in the ledger totals but are excluded from
/// balance calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Opaque id, unassigned until first persistence.
    #[serde(default)]
    pub id: RecordId,
    /// Short description of the payment.
    pub title: String,
    /// Non-negative amount in the group's currency.
    pub amount: f64,
    /// Participant who paid.
    pub paid_by: String,
    /// Participants the amount is split across.
    pub participants: Vec<String>,
    /// When the payment happened.
    pub date: DateTime<Utc>,
    /// Settled expenses are ignored by balance calculation.
    #[serde(default)]
    pub settled: bool,
    /// Owning group.
    pub group_id: RecordId,
    /// Owner identity, stamped on first save.
    #[serde(default)]
    pub created_by: String,
    /// Optional category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Expense {
    /// Creates an unsaved, unsettled expense dated now.
    #[must_use]
    pub fn new(
        group_id: RecordId,
        title: impl Into<String>,
        amount: f64,
        paid_by: impl Into<String>,
        participants: Vec<String>,
    ) -> Self {
        Self {
            id: RecordId::unassigned(),
            title: title.into(),
            amount,
            paid_by: paid_by.into(),
            participants,
            date: Utc::now(),
            settled: false,
            group_id,
            created_by: String::new(),
            category: None,
        }
    }

    /// Marks the expense settled, builder style.
    #[must_use]
    pub fn settled(mut self, settled: bool) -> Self {
        self.settled = settled;
        self
    }

    /// Sets the category, builder style.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Per-participant share, or `None` when there are no participants.
    #[must_use]
    pub fn share(&self) -> Option<f64> {
        if self.participants.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.participants.len() as f64;
        Some(self.amount / count)
    }

    /// Checks the expense against the group it is being saved into.
    ///
    /// Membership is only checked here, at save time; later edits to the
    /// group's participants do not invalidate stored expenses.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] if the title is blank, the amount
    /// is negative or not finite, the participant list is empty, the payer
    /// or a participant is not a member of `group`, or `group_id` does not
    /// match `group`.
    pub fn validate_against(&self, group: &Group) -> Result<(), LedgerError> {
        if self.title.trim().is_empty() {
            return Err(LedgerError::Validation("expense title is required".to_string()));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(LedgerError::Validation(format!(
                "expense amount must be a non-negative number, got {}",
                self.amount
            )));
        }
        if self.participants.is_empty() {
            return Err(LedgerError::Validation(
                "expense needs at least one participant".to_string(),
            ));
        }
        if self.group_id != group.id {
            return Err(LedgerError::Validation(format!(
                "expense belongs to group {} but was saved into {}",
                self.group_id, group.id
            )));
        }
        if !group.has_participant(&self.paid_by) {
            return Err(LedgerError::Validation(format!(
                "payer {} is not a participant of the group",
                self.paid_by
            )));
        }
        if let Some(outsider) = self.participants.iter().find(|p| !group.has_participant(p)) {
            return Err(LedgerError::Validation(format!(
                "{outsider} is not a participant of the group"
            )));
        }
        Ok(())
    }
}

impl Record for Expense {
    const COLLECTION: Collection = Collection::Expenses;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn owner(&self) -> &str {
        &self.created_by
    }

    fn stamp_creation(&mut self, owner: &str, _now: DateTime<Utc>) {
        self.created_by = owner.to_string();
    }

    fn snapshot(records: Vec<Self>) -> CollectionSnapshot {
        CollectionSnapshot::Expenses(records)
    }

    fn inherit_creation(&mut self, stored: &Self) {
        self.created_by.clone_from(&stored.created_by);
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn group() -> Group {
        let mut group = Group::new("Trip", "EUR", vec!["A".into(), "B".into(), "C".into()]);
        group.id = RecordId::new("g1");
        group
    }

    fn dinner() -> Expense {
        Expense::new(
            RecordId::new("g1"),
            "Dinner",
            90.0,
            "A",
            vec!["A".into(), "B".into(), "C".into()],
        )
    }

    #[test]
    fn share_splits_evenly() {
        assert_eq!(dinner().share(), Some(30.0));
    }

    #[test]
    fn share_of_empty_participants_is_none() {
        let mut expense = dinner();
        expense.participants.clear();
        assert_eq!(expense.share(), None);
    }

    #[test]
    fn valid_expense_passes() {
        assert!(dinner().validate_against(&group()).is_ok());
    }

    #[test]
    fn payer_outside_group_rejected() {
        let mut expense = dinner();
        expense.paid_by = "Z".to_string();
        let Err(LedgerError::Validation(msg)) = expense.validate_against(&group()) else {
            panic!("expected validation failure");
        };
        assert!(msg.contains("payer"));
    }

    #[test]
    fn participant_outside_group_rejected() {
        let mut expense = dinner();
        expense.participants.push("Q".to_string());
        assert!(expense.validate_against(&group()).is_err());
    }

    #[test]
    fn negative_amount_rejected() {
        let mut expense = dinner();
        expense.amount = -1.0;
        assert!(expense.validate_against(&group()).is_err());
    }

    #[test]
    fn empty_participants_rejected() {
        let mut expense = dinner();
        expense.participants.clear();
        assert!(expense.validate_against(&group()).is_err());
    }

    #[test]
    fn mismatched_group_rejected() {
        let mut expense = dinner();
        expense.group_id = RecordId::new("other");
        assert!(expense.validate_against(&group()).is_err());
    }

    #[test]
    fn category_is_omitted_when_absent() {
        let Ok(json) = serde_json::to_string(&dinner()) else {
            panic!("serialization failed");
        };
        assert!(!json.contains("category"));
        assert!(json.contains("paidBy"));
        assert!(json.contains("groupId"));
    }
}
