//! Settlement engine: net balances and greedy minimal-transfer netting.
//!
//! Everything here is a pure function of a group and its expenses. The
//! [`crate::service::LedgerService`] reads a snapshot from the record store
//! and hands it to these functions; nothing in this module touches storage.
//!
//! Arithmetic is plain `f64` with no rounding during accumulation. Only the
//! emitted transfer amounts are rounded, to two decimals.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use utoipa::ToSchema;

use super::{Expense, Group, RecordId};

/// Balances and residuals within this distance of zero are treated as settled.
pub const SETTLEMENT_EPSILON: f64 = 0.01;

/// Net position of one participant. Positive means the group owes them.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ParticipantBalance {
    /// Participant display name.
    pub name: String,
    /// Signed net amount.
    pub balance: f64,
}

/// Net balances of a group, in participant order.
///
/// Group participants come first, in group order. A payer or beneficiary
/// that is no longer listed in the group is appended in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Balances {
    entries: Vec<ParticipantBalance>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Balances {
    /// Creates balances with every name seeded at zero.
    #[must_use]
    pub fn seeded<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut balances = Self::default();
        for name in names {
            let _ = balances.slot(name);
        }
        balances
    }

    fn slot(&mut self, name: &str) -> Option<&mut f64> {
        let position = match self.index.get(name) {
            Some(&position) => position,
            None => {
                let position = self.entries.len();
                self.entries.push(ParticipantBalance {
                    name: name.to_string(),
                    balance: 0.0,
                });
                self.index.insert(name.to_string(), position);
                position
            }
        };
        self.entries.get_mut(position).map(|entry| &mut entry.balance)
    }

    fn credit(&mut self, name: &str, amount: f64) {
        if let Some(balance) = self.slot(name) {
            *balance += amount;
        }
    }

    fn debit(&mut self, name: &str, amount: f64) {
        if let Some(balance) = self.slot(name) {
            *balance -= amount;
        }
    }

    /// Returns the balance of `name`, if it is tracked.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.index
            .get(name)
            .and_then(|&position| self.entries.get(position))
            .map(|entry| entry.balance)
    }

    /// Iterates over balances in participant order.
    pub fn iter(&self) -> impl Iterator<Item = &ParticipantBalance> {
        self.entries.iter()
    }

    /// Returns the balances as a slice, in participant order.
    #[must_use]
    pub fn as_slice(&self) -> &[ParticipantBalance] {
        &self.entries
    }

    /// Number of tracked participants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no participant is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all positive balances: the total that has to change hands.
    #[must_use]
    pub fn positive_total(&self) -> f64 {
        self.entries
            .iter()
            .map(|entry| entry.balance)
            .filter(|balance| *balance > 0.0)
            .sum()
    }
}

/// One payment in a settlement plan.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Transfer {
    /// Debtor.
    pub from: String,
    /// Creditor.
    pub to: String,
    /// Amount, rounded to two decimals.
    pub amount: f64,
}

/// Computes signed net balances for `group` from its unsettled expenses.
///
/// Expenses belonging to other groups are ignored, so callers may pass the
/// whole expense collection. Each unsettled expense credits the payer with
/// the full amount and debits every participant with an equal share; a
/// payer who is also a participant therefore nets `amount - share`.
/// Expenses with no participants have no computable share and are skipped.
#[must_use]
pub fn calculate_balances(group: &Group, expenses: &[Expense]) -> Balances {
    let mut balances = Balances::seeded(group.participants.iter().map(String::as_str));

    for expense in in_group(&group.id, expenses).filter(|e| !e.settled) {
        let Some(share) = expense.share() else {
            tracing::warn!(expense_id = %expense.id, "skipping expense without participants");
            continue;
        };
        balances.credit(&expense.paid_by, expense.amount);
        for participant in &expense.participants {
            balances.debit(participant, share);
        }
    }

    balances
}

/// Reduces balances to a short list of transfers that zeroes them.
///
/// Participants are sorted ascending by balance (stable, so ties keep
/// participant order). The biggest remaining debtor pays the biggest
/// remaining creditor `min(|debt|, credit)`; whichever side reaches zero
/// (within [`SETTLEMENT_EPSILON`]) is retired. The sweep stops when the
/// pointers meet, when both sides are already settled, or when the next
/// viable transfer is not larger than the epsilon. The plan never has more
/// than `participants - 1` entries.
#[must_use]
pub fn settle(balances: &Balances) -> Vec<Transfer> {
    let mut ledger: Vec<(String, f64)> = balances
        .iter()
        .map(|entry| (entry.name.clone(), entry.balance))
        .collect();
    ledger.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut transfers = Vec::new();
    let Some(mut j) = ledger.len().checked_sub(1) else {
        return transfers;
    };
    let mut i = 0;

    while i < j {
        let (Some((debtor, debt)), Some((creditor, credit))) = (ledger.get(i), ledger.get(j))
        else {
            break;
        };
        let (debt, credit) = (*debt, *credit);
        if debt.abs() < SETTLEMENT_EPSILON && credit.abs() < SETTLEMENT_EPSILON {
            break;
        }

        // A non-negative "debtor" means nobody owes anything any more.
        let amount = (-debt).max(0.0).min(credit);
        if amount <= SETTLEMENT_EPSILON {
            break;
        }

        transfers.push(Transfer {
            from: debtor.clone(),
            to: creditor.clone(),
            amount: round_cents(amount),
        });

        let debt = debt + amount;
        let credit = credit - amount;
        if let Some(entry) = ledger.get_mut(i) {
            entry.1 = debt;
        }
        if let Some(entry) = ledger.get_mut(j) {
            entry.1 = credit;
        }
        if debt.abs() < SETTLEMENT_EPSILON {
            i += 1;
        }
        if credit.abs() < SETTLEMENT_EPSILON {
            j -= 1;
        }
    }

    transfers
}

/// Convenience: [`calculate_balances`] followed by [`settle`].
#[must_use]
pub fn settle_group(group: &Group, expenses: &[Expense]) -> Vec<Transfer> {
    settle(&calculate_balances(group, expenses))
}

/// Sum of every expense amount in the group, settled ones included.
#[must_use]
pub fn total_expenses(group_id: &RecordId, expenses: &[Expense]) -> f64 {
    in_group(group_id, expenses).map(|e| e.amount).sum()
}

/// Amount paid per payer in the group, settled expenses included.
#[must_use]
pub fn expenses_by_payer(group_id: &RecordId, expenses: &[Expense]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for expense in in_group(group_id, expenses) {
        *totals.entry(expense.paid_by.clone()).or_insert(0.0) += expense.amount;
    }
    totals
}

fn in_group<'a>(
    group_id: &'a RecordId,
    expenses: &'a [Expense],
) -> impl Iterator<Item = &'a Expense> + 'a {
    expenses.iter().filter(move |e| &e.group_id == group_id)
}

/// Rounds to two decimals, half away from zero.
#[must_use]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
