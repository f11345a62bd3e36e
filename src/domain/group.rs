//! Expense-sharing group.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::collection::{Collection, Record};
use super::CollectionSnapshot;
use super::RecordId;
use crate::error::LedgerError;

/// A named set of participants sharing expenses.
///
/// `participants` is ordered; duplicates are not rejected by the model but
/// callers are expected to keep names unique. Balance maps are keyed by
/// these display names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Opaque id, unassigned until first persistence.
    #[serde(default)]
    pub id: RecordId,
    /// Display name.
    pub name: String,
    /// Currency code (e.g. `"EUR"`).
    pub currency: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Participant display names.
    pub participants: Vec<String>,
    /// Owner identity, stamped on first save.
    #[serde(default)]
    pub created_by: String,
    /// Creation timestamp, stamped on first save.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Creates an unsaved group.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        currency: impl Into<String>,
        participants: Vec<String>,
    ) -> Self {
        Self {
            id: RecordId::unassigned(),
            name: name.into(),
            currency: currency.into(),
            description: String::new(),
            participants,
            created_by: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Sets the description, builder style.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns `true` if `name` is one of the participants.
    #[must_use]
    pub fn has_participant(&self, name: &str) -> bool {
        self.participants.iter().any(|p| p == name)
    }

    /// Checks the group before it is written to the store.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] if the name or currency is blank,
    /// the participant list is empty, or a participant name is blank.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::Validation("group name is required".to_string()));
        }
        if self.currency.trim().is_empty() {
            return Err(LedgerError::Validation("group currency is required".to_string()));
        }
        if self.participants.is_empty() {
            return Err(LedgerError::Validation(
                "group needs at least one participant".to_string(),
            ));
        }
        if self.participants.iter().any(|p| p.trim().is_empty()) {
            return Err(LedgerError::Validation(
                "participant names must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

impl Record for Group {
    const COLLECTION: Collection = Collection::Groups;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn owner(&self) -> &str {
        &self.created_by
    }

    fn stamp_creation(&mut self, owner: &str, now: DateTime<Utc>) {
        self.created_by = owner.to_string();
        self.created_at = now;
    }

    fn snapshot(records: Vec<Self>) -> CollectionSnapshot {
        CollectionSnapshot::Groups(records)
    }

    fn inherit_creation(&mut self, stored: &Self) {
        self.created_by.clone_from(&stored.created_by);
        self.created_at = stored.created_at;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn trio() -> Group {
        Group::new("Trip", "EUR", vec!["A".into(), "B".into(), "C".into()])
    }

    #[test]
    fn new_group_is_unsaved() {
        let group = trio();
        assert!(group.id.is_unassigned());
        assert!(group.created_by.is_empty());
    }

    #[test]
    fn valid_group_passes() {
        assert!(trio().validate().is_ok());
    }

    #[test]
    fn empty_participants_rejected() {
        let mut group = trio();
        group.participants.clear();
        let Err(LedgerError::Validation(msg)) = group.validate() else {
            panic!("expected validation failure");
        };
        assert!(msg.contains("participant"));
    }

    #[test]
    fn blank_name_rejected() {
        let mut group = trio();
        group.name = "  ".to_string();
        assert!(group.validate().is_err());
    }

    #[test]
    fn deserializes_camel_case_document() {
        let json = r#"{"id":"g1","name":"Flat","currency":"USD","participants":["A"],"createdBy":"u1","createdAt":"2024-01-01T00:00:00Z"}"#;
        let Ok(group) = serde_json::from_str::<Group>(json) else {
            panic!("deserialization failed");
        };
        assert_eq!(group.id.as_str(), "g1");
        assert_eq!(group.created_by, "u1");
        assert!(group.description.is_empty());
    }
}
