//! Change notifications emitted by the record store.
//!
//! Every mutating store call publishes a [`ChangeEvent`] through the
//! [`super::EventBus`] carrying the full post-write snapshot of the
//! affected collection. Subscribers hold no other state: what they last
//! received is what they know.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Collection, Expense, Group};

/// Who caused a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    /// A caller-initiated mutation (UI, REST, tests).
    Local,
    /// A write-back performed by reconciliation.
    Sync,
}

/// Full contents of one collection after a write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "collection", content = "records", rename_all = "snake_case")]
pub enum CollectionSnapshot {
    /// Every group.
    Groups(Vec<Group>),
    /// Every expense.
    Expenses(Vec<Expense>),
    /// The active group pointer.
    ActiveGroup(Option<Group>),
}

impl CollectionSnapshot {
    /// Returns the collection this snapshot belongs to.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Groups(_) => Collection::Groups,
            Self::Expenses(_) => Collection::Expenses,
            Self::ActiveGroup(_) => Collection::ActiveGroup,
        }
    }

    /// Number of records in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Groups(groups) => groups.len(),
            Self::Expenses(expenses) => expenses.len(),
            Self::ActiveGroup(active) => usize::from(active.is_some()),
        }
    }

    /// Returns `true` if the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Notification published after every record store mutation.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    /// Owner of the mutated collection.
    pub user_id: String,
    /// Whether the write came from a caller or from reconciliation.
    pub origin: ChangeOrigin,
    /// Post-write contents of the collection.
    pub snapshot: CollectionSnapshot,
    /// Time of the write.
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(user_id: impl Into<String>, origin: ChangeOrigin, snapshot: CollectionSnapshot) -> Self {
        Self {
            user_id: user_id.into(),
            origin,
            snapshot,
            timestamp: Utc::now(),
        }
    }

    /// Returns the mutated collection.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        self.snapshot.collection()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_collection_and_len() {
        let snapshot = CollectionSnapshot::ActiveGroup(None);
        assert_eq!(snapshot.collection(), Collection::ActiveGroup);
        assert!(snapshot.is_empty());

        let snapshot = CollectionSnapshot::Groups(vec![Group::new("G", "EUR", vec!["A".into()])]);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn serializes_with_collection_tag() {
        let event = ChangeEvent::new("u1", ChangeOrigin::Local, CollectionSnapshot::Expenses(vec![]));
        let Ok(json) = serde_json::to_string(&event) else {
            panic!("serialization failed");
        };
        assert!(json.contains("\"collection\":\"expenses\""));
        assert!(json.contains("\"origin\":\"local\""));
    }
}
