//! Opaque record identifier.
//!
//! [`RecordId`] is a newtype around the string token used as the key of
//! every group and expense. Records are created with an unassigned (empty)
//! id; the [`super::RecordStore`] assigns one on first persistence. Ids that
//! arrive from the remote store are kept verbatim, so no format is enforced.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a group or an expense.
///
/// Immutable once assigned. Generated ids are UUID v4 strings, but any
/// non-empty token is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Returns the unassigned id carried by records that were never saved.
    #[must_use]
    pub const fn unassigned() -> Self {
        Self(String::new())
    }

    /// Creates a new random id (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wraps an existing token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns `true` if no id has been assigned yet.
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl From<String> for RecordId {
    fn from(token: String) -> Self {
        Self(token)
    }
}
