//! Per-user synchronization status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Last-known outcome of reconciliation, persisted under the user's
/// `sync_status` key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Local changes exist that have not been reconciled yet.
    #[default]
    Pending,
    /// The last reconciliation completed.
    Synced,
    /// The last reconciliation failed.
    Error,
}

/// Orchestrator phase. Exactly one reconciliation may run at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Nothing scheduled.
    #[default]
    Idle,
    /// A debounce countdown is armed.
    Debouncing,
    /// A reconciliation is in flight.
    Syncing,
}

/// Passive sync indicator exposed to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SyncState {
    /// Time of the last successful reconciliation.
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    /// Whether a reconciliation is in flight.
    #[serde(default)]
    pub sync_in_progress: bool,
    /// Set when data changed while offline; cleared by a successful sync.
    #[serde(default)]
    pub pending_local_changes_since_offline: bool,
    /// Last-known outcome.
    #[serde(default)]
    pub status: SyncStatus,
    /// Message of the last failure, cleared on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SyncState {
    /// Returns `true` if the last success is younger than `min_interval`.
    #[must_use]
    pub fn synced_within(&self, min_interval: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.last_sync_timestamp
            .is_some_and(|last| now.signed_duration_since(last) < min_interval)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_is_pending_and_never_synced() {
        let state = SyncState::default();
        assert_eq!(state.status, SyncStatus::Pending);
        assert!(state.last_sync_timestamp.is_none());
        assert!(!state.synced_within(chrono::Duration::seconds(30), Utc::now()));
    }

    #[test]
    fn synced_within_compares_against_last_success() {
        let now = Utc::now();
        let state = SyncState {
            last_sync_timestamp: Some(now - chrono::Duration::seconds(10)),
            ..SyncState::default()
        };
        assert!(state.synced_within(chrono::Duration::seconds(30), now));
        assert!(!state.synced_within(chrono::Duration::seconds(5), now));
    }

    #[test]
    fn status_serializes_lowercase() {
        let Ok(json) = serde_json::to_string(&SyncStatus::Error) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"error\"");
    }
}
