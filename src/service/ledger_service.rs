//! Ledger service: validated record operations and settlement queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::settlement::{self, round_cents};
use crate::domain::{
    Balances, Collection, Expense, Group, ParticipantBalance, RecordId, RecordStore, Transfer,
};
use crate::error::LedgerError;

/// Totals, balances and a settlement plan for one group.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    /// Group id.
    pub group_id: RecordId,
    /// Group name.
    pub name: String,
    /// Currency code.
    pub currency: String,
    /// Number of expenses, settled ones included.
    pub expense_count: usize,
    /// Sum of every expense, rounded to cents.
    pub total_expenses: f64,
    /// Amount paid per payer, rounded to cents.
    pub by_payer: BTreeMap<String, f64>,
    /// Net balances over unsettled expenses.
    pub balances: Vec<ParticipantBalance>,
    /// Transfers that settle the balances.
    pub transfers: Vec<Transfer>,
}

/// Coordinates record mutations with their invariants.
///
/// Every mutation follows the pattern: load what the invariant needs →
/// validate → write through the [`RecordStore`] (which notifies) → log.
/// Settlement queries load a snapshot and hand it to
/// [`crate::domain::settlement`].
#[derive(Debug, Clone)]
pub struct LedgerService {
    store: Arc<RecordStore>,
}

impl LedgerService {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying record store.
    #[must_use]
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Lists every group.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] or a storage error.
    pub async fn list_groups(&self) -> Result<Vec<Group>, LedgerError> {
        self.store.list().await
    }

    /// Fetches one group.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no group has `id`.
    pub async fn get_group(&self, id: &RecordId) -> Result<Group, LedgerError> {
        self.store
            .get::<Group>(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(Collection::Groups, id))
    }

    /// Validates and creates a group. Any id on the input is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] for an invalid group.
    pub async fn create_group(&self, mut group: Group) -> Result<Group, LedgerError> {
        group.id = RecordId::unassigned();
        group.validate()?;
        let saved = self.store.put(group).await?;
        tracing::info!(group_id = %saved.id, name = %saved.name, "group created");
        Ok(saved)
    }

    /// Validates and replaces group `id`. If it is the active group, the
    /// pointer is refreshed with the new version.
    ///
    /// Existing expenses are not re-validated against the new participant
    /// list.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no group has `id`, or
    /// [`LedgerError::Validation`] for an invalid group.
    pub async fn update_group(&self, id: &RecordId, mut group: Group) -> Result<Group, LedgerError> {
        let _ = self.get_group(id).await?;
        group.id = id.clone();
        group.validate()?;
        let saved = self.store.put(group).await?;

        if self.is_active(id).await? {
            self.store.set_active(saved.clone()).await?;
        }
        tracing::info!(group_id = %saved.id, "group updated");
        Ok(saved)
    }

    /// Deletes group `id`, every expense that belongs to it, and the
    /// active-group pointer if it referenced the group.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no group has `id`.
    pub async fn delete_group(&self, id: &RecordId) -> Result<(), LedgerError> {
        if !self.store.delete::<Group>(id).await? {
            return Err(LedgerError::not_found(Collection::Groups, id));
        }
        let expenses = self
            .store
            .delete_where::<Expense>(|expense| &expense.group_id == id)
            .await?;
        let was_active = self.is_active(id).await?;
        if was_active {
            self.store.clear_active().await?;
        }
        tracing::info!(group_id = %id, expenses, was_active, "group deleted");
        Ok(())
    }

    /// Lists the expenses of group `group_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no group has `group_id`.
    pub async fn list_expenses(&self, group_id: &RecordId) -> Result<Vec<Expense>, LedgerError> {
        let _ = self.get_group(group_id).await?;
        self.group_expenses(group_id).await
    }

    /// Fetches one expense.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no expense has `id`.
    pub async fn get_expense(&self, id: &RecordId) -> Result<Expense, LedgerError> {
        self.store
            .get::<Expense>(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(Collection::Expenses, id))
    }

    /// Validates `expense` against group `group_id` and creates it there.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no group has `group_id`, or
    /// [`LedgerError::Validation`] if the expense is invalid for the group.
    pub async fn create_expense(
        &self,
        group_id: &RecordId,
        mut expense: Expense,
    ) -> Result<Expense, LedgerError> {
        let group = self.get_group(group_id).await?;
        expense.id = RecordId::unassigned();
        expense.group_id = group.id.clone();
        expense.validate_against(&group)?;
        let saved = self.store.put(expense).await?;
        tracing::info!(expense_id = %saved.id, group_id = %group.id, amount = saved.amount, "expense created");
        Ok(saved)
    }

    /// Validates and replaces expense `id`. The expense stays in its group.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the expense or its group is
    /// missing, or [`LedgerError::Validation`] if the new version is invalid.
    pub async fn update_expense(
        &self,
        id: &RecordId,
        mut expense: Expense,
    ) -> Result<Expense, LedgerError> {
        let existing = self.get_expense(id).await?;
        let group = self.get_group(&existing.group_id).await?;
        expense.id = id.clone();
        expense.group_id = existing.group_id;
        expense.validate_against(&group)?;
        let saved = self.store.put(expense).await?;
        tracing::info!(expense_id = %saved.id, "expense updated");
        Ok(saved)
    }

    /// Deletes expense `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no expense has `id`.
    pub async fn delete_expense(&self, id: &RecordId) -> Result<(), LedgerError> {
        if !self.store.delete::<Expense>(id).await? {
            return Err(LedgerError::not_found(Collection::Expenses, id));
        }
        tracing::info!(expense_id = %id, "expense deleted");
        Ok(())
    }

    /// Returns the active group, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] or a storage error.
    pub async fn active_group(&self) -> Result<Option<Group>, LedgerError> {
        self.store.get_active().await
    }

    /// Points the active-group pointer at group `group_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no group has `group_id`.
    pub async fn set_active_group(&self, group_id: &RecordId) -> Result<Group, LedgerError> {
        let group = self.get_group(group_id).await?;
        self.store.set_active(group.clone()).await?;
        tracing::debug!(group_id = %group.id, "active group set");
        Ok(group)
    }

    /// Clears the active-group pointer.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] or a storage error.
    pub async fn clear_active_group(&self) -> Result<(), LedgerError> {
        self.store.clear_active().await
    }

    /// Net balances of group `group_id` over its unsettled expenses.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no group has `group_id`.
    pub async fn calculate_balances(&self, group_id: &RecordId) -> Result<Balances, LedgerError> {
        let (group, expenses) = self.group_snapshot(group_id).await?;
        Ok(settlement::calculate_balances(&group, &expenses))
    }

    /// Settlement plan for group `group_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no group has `group_id`.
    pub async fn settle(&self, group_id: &RecordId) -> Result<Vec<Transfer>, LedgerError> {
        let (group, expenses) = self.group_snapshot(group_id).await?;
        Ok(settlement::settle_group(&group, &expenses))
    }

    /// Sum of every expense in group `group_id`, settled ones included.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no group has `group_id`.
    pub async fn total_expenses(&self, group_id: &RecordId) -> Result<f64, LedgerError> {
        let (group, expenses) = self.group_snapshot(group_id).await?;
        Ok(settlement::total_expenses(&group.id, &expenses))
    }

    /// Amount paid per payer in group `group_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no group has `group_id`.
    pub async fn expenses_by_payer(
        &self,
        group_id: &RecordId,
    ) -> Result<BTreeMap<String, f64>, LedgerError> {
        let (group, expenses) = self.group_snapshot(group_id).await?;
        Ok(settlement::expenses_by_payer(&group.id, &expenses))
    }

    /// Totals, balances and settlement plan of group `group_id` from one
    /// consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no group has `group_id`.
    pub async fn group_summary(&self, group_id: &RecordId) -> Result<GroupSummary, LedgerError> {
        let (group, expenses) = self.group_snapshot(group_id).await?;
        let balances = settlement::calculate_balances(&group, &expenses);
        let transfers = settlement::settle(&balances);
        let by_payer = settlement::expenses_by_payer(&group.id, &expenses)
            .into_iter()
            .map(|(payer, amount)| (payer, round_cents(amount)))
            .collect();

        Ok(GroupSummary {
            total_expenses: round_cents(settlement::total_expenses(&group.id, &expenses)),
            expense_count: expenses.len(),
            by_payer,
            balances: balances.as_slice().to_vec(),
            transfers,
            group_id: group.id,
            name: group.name,
            currency: group.currency,
        })
    }

    async fn group_snapshot(
        &self,
        group_id: &RecordId,
    ) -> Result<(Group, Vec<Expense>), LedgerError> {
        let group = self.get_group(group_id).await?;
        let expenses = self.group_expenses(group_id).await?;
        Ok((group, expenses))
    }

    async fn group_expenses(&self, group_id: &RecordId) -> Result<Vec<Expense>, LedgerError> {
        let mut expenses: Vec<Expense> = self.store.list().await?;
        expenses.retain(|expense| &expense.group_id == group_id);
        Ok(expenses)
    }

    async fn is_active(&self, group_id: &RecordId) -> Result<bool, LedgerError> {
        Ok(self
            .store
            .get_active()
            .await?
            .is_some_and(|active| &active.id == group_id))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ChangeOrigin, EventBus};
    use crate::identity::{IdentityProvider, SessionIdentity};
    use crate::persistence::{KeyValueStorage, MemoryStorage};

    fn make_service() -> LedgerService {
        let store = RecordStore::new(
            Arc::new(MemoryStorage::new()) as Arc<dyn KeyValueStorage>,
            Arc::new(SessionIdentity::signed_in("u1", true)) as Arc<dyn IdentityProvider>,
            EventBus::new(256),
        );
        LedgerService::new(Arc::new(store))
    }

    fn trio() -> Group {
        Group::new("Trip", "EUR", vec!["A".into(), "B".into(), "C".into()])
    }

    fn dinner(amount: f64) -> Expense {
        Expense::new(
            RecordId::unassigned(),
            "Dinner",
            amount,
            "A",
            vec!["A".into(), "B".into(), "C".into()],
        )
    }

    async fn seeded(service: &LedgerService) -> Group {
        let Ok(group) = service.create_group(trio()).await else {
            panic!("create group failed");
        };
        group
    }

    #[tokio::test]
    async fn create_group_rejects_invalid_input() {
        let service = make_service();
        let invalid = Group::new("", "EUR", vec!["A".into()]);
        assert!(matches!(
            service.create_group(invalid).await,
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(service.list_groups().await, Ok(ref g) if g.is_empty()));
    }

    #[tokio::test]
    async fn create_group_discards_caller_id() {
        let service = make_service();
        let mut group = trio();
        group.id = RecordId::new("chosen");
        let Ok(saved) = service.create_group(group).await else {
            panic!("create failed");
        };
        assert_ne!(saved.id.as_str(), "chosen");
        assert_eq!(saved.created_by, "u1");
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let service = make_service();
        let id = RecordId::new("missing");
        assert!(matches!(
            service.get_group(&id).await,
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            service.settle(&id).await,
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            service.delete_group(&id).await,
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn expense_must_fit_group() {
        let service = make_service();
        let group = seeded(&service).await;
        let mut outsider = dinner(30.0);
        outsider.paid_by = "Z".to_string();
        assert!(matches!(
            service.create_expense(&group.id, outsider).await,
            Err(LedgerError::Validation(_))
        ));

        let Ok(saved) = service.create_expense(&group.id, dinner(30.0)).await else {
            panic!("create expense failed");
        };
        assert_eq!(saved.group_id, group.id);
    }

    #[tokio::test]
    async fn deleting_group_cascades() {
        let service = make_service();
        let group = seeded(&service).await;
        let Ok(other) = service.create_group(trio()).await else {
            panic!("create group failed");
        };
        assert!(service.create_expense(&group.id, dinner(30.0)).await.is_ok());
        assert!(service.create_expense(&group.id, dinner(60.0)).await.is_ok());
        assert!(service.create_expense(&other.id, dinner(9.0)).await.is_ok());
        assert!(service.set_active_group(&group.id).await.is_ok());

        assert!(service.delete_group(&group.id).await.is_ok());

        let Ok(remaining) = service.store().list::<Expense>().await else {
            panic!("list failed");
        };
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().all(|e| e.group_id == other.id));
        assert!(matches!(service.active_group().await, Ok(None)));
    }

    #[tokio::test]
    async fn deleting_inactive_group_keeps_pointer() {
        let service = make_service();
        let group = seeded(&service).await;
        let Ok(other) = service.create_group(trio()).await else {
            panic!("create group failed");
        };
        assert!(service.set_active_group(&other.id).await.is_ok());
        assert!(service.delete_group(&group.id).await.is_ok());
        assert!(matches!(service.active_group().await, Ok(Some(ref g)) if g.id == other.id));
    }

    #[tokio::test]
    async fn updating_active_group_refreshes_pointer() {
        let service = make_service();
        let group = seeded(&service).await;
        assert!(service.set_active_group(&group.id).await.is_ok());

        let mut renamed = group.clone();
        renamed.name = "Renamed".to_string();
        assert!(service.update_group(&group.id, renamed).await.is_ok());
        assert!(matches!(
            service.active_group().await,
            Ok(Some(ref g)) if g.name == "Renamed"
        ));
    }

    #[tokio::test]
    async fn update_expense_keeps_group() {
        let service = make_service();
        let group = seeded(&service).await;
        let Ok(saved) = service.create_expense(&group.id, dinner(30.0)).await else {
            panic!("create expense failed");
        };

        let mut edited = saved.clone();
        edited.amount = 45.0;
        edited.group_id = RecordId::new("elsewhere");
        let Ok(updated) = service.update_expense(&saved.id, edited).await else {
            panic!("update failed");
        };
        assert_eq!(updated.group_id, group.id);
        assert!((updated.amount - 45.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn settlement_matches_balances() {
        let service = make_service();
        let group = seeded(&service).await;
        assert!(service.create_expense(&group.id, dinner(90.0)).await.is_ok());

        let Ok(balances) = service.calculate_balances(&group.id).await else {
            panic!("balances failed");
        };
        assert_eq!(balances.get("A").map(round_cents), Some(60.0));
        assert_eq!(balances.get("B").map(round_cents), Some(-30.0));

        let Ok(transfers) = service.settle(&group.id).await else {
            panic!("settle failed");
        };
        assert_eq!(transfers.len(), 2);
        assert!(transfers.iter().all(|t| t.to == "A"));
        assert!(transfers.iter().all(|t| (t.amount - 30.0).abs() < 1e-9));
    }

    #[tokio::test]
    async fn summary_counts_settled_expenses_in_totals_only() {
        let service = make_service();
        let group = seeded(&service).await;
        assert!(service.create_expense(&group.id, dinner(90.0)).await.is_ok());
        let mut paid_back = dinner(30.0).settled(true);
        paid_back.paid_by = "B".to_string();
        assert!(service.create_expense(&group.id, paid_back).await.is_ok());

        let Ok(summary) = service.group_summary(&group.id).await else {
            panic!("summary failed");
        };
        assert_eq!(summary.expense_count, 2);
        assert!((summary.total_expenses - 120.0).abs() < 1e-9);
        assert_eq!(summary.by_payer.get("B").copied(), Some(30.0));
        assert_eq!(summary.transfers.len(), 2);
    }

    #[tokio::test]
    async fn mutations_are_published_as_local() {
        let service = make_service();
        let mut rx = service.store().subscribe();
        let _ = seeded(&service).await;
        let Ok(event) = rx.try_recv() else {
            panic!("notification expected");
        };
        assert_eq!(event.origin, ChangeOrigin::Local);
    }
}
