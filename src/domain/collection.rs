//! Collection names and the [`Record`] trait shared by groups and expenses.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{CollectionSnapshot, RecordId};

/// One of the three per-user collections kept by the record store and
/// mirrored to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// All groups owned by the user.
    Groups,
    /// All expenses owned by the user, across groups.
    Expenses,
    /// The active-group pointer (zero or one group).
    ActiveGroup,
}

impl Collection {
    /// Every collection, in reconciliation order.
    pub const ALL: [Self; 3] = [Self::Groups, Self::Expenses, Self::ActiveGroup];

    /// Returns the collection name used in storage keys and remote paths.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Groups => "groups",
            Self::Expenses => "expenses",
            Self::ActiveGroup => "active_group",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "groups" => Ok(Self::Groups),
            "expenses" => Ok(Self::Expenses),
            "active_group" => Ok(Self::ActiveGroup),
            other => Err(format!("unknown collection: {other}")),
        }
    }
}

/// A keyed document stored in one of the id-addressed collections.
///
/// Implemented by [`super::Group`] and [`super::Expense`]. The active-group
/// pointer is not a `Record` collection of its own; it stores a `Group`.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The collection this record type lives in.
    const COLLECTION: Collection;

    /// Returns the record id (possibly unassigned).
    fn id(&self) -> &RecordId;

    /// Overwrites the record id.
    fn set_id(&mut self, id: RecordId);

    /// Owner identity, empty until stamped.
    fn owner(&self) -> &str;

    /// Stamps ownership and creation metadata on first persistence.
    fn stamp_creation(&mut self, owner: &str, now: DateTime<Utc>);

    /// Copies creation metadata from the stored version of the same record.
    fn inherit_creation(&mut self, stored: &Self);

    /// Wraps a full collection for a change notification.
    fn snapshot(records: Vec<Self>) -> CollectionSnapshot;
}
