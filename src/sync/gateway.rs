//! Remote document store contract.
//!
//! The remote store holds one document per (owner, collection): the full
//! list of records plus the time it was last written. Writes are full
//! overwrites; there is no incremental API.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::Collection;
use crate::error::LedgerError;

/// Snapshot of one remote collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    /// Serialized records, opaque to the gateway.
    pub items: Vec<serde_json::Value>,
    /// When the document was last replaced.
    pub last_synced: DateTime<Utc>,
}

/// Access to the remote authoritative store.
///
/// Implementations should not retry; the sync orchestrator retries on the
/// next trigger. Calls may block indefinitely, so the orchestrator wraps
/// each one in a timeout.
#[async_trait]
pub trait RemoteGateway: Send + Sync + fmt::Debug {
    /// Fetches the document for `owner_id`/`collection`, or `None` if it was
    /// never written.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::RemoteUnavailable`] on network or store failure.
    async fn fetch(
        &self,
        owner_id: &str,
        collection: Collection,
    ) -> Result<Option<RemoteDocument>, LedgerError>;

    /// Overwrites the document for `owner_id`/`collection`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::RemoteUnavailable`] on network or store failure.
    async fn replace(
        &self,
        owner_id: &str,
        collection: Collection,
        items: Vec<serde_json::Value>,
        last_synced: DateTime<Utc>,
    ) -> Result<(), LedgerError>;
}

/// Remote store kept in process memory.
///
/// Used by tests and by the binary when no database is configured. Several
/// sessions can share one instance to model multiple devices. Outages and
/// latency can be simulated.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    documents: RwLock<HashMap<(String, Collection), RemoteDocument>>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
    fetches: AtomicUsize,
    replaces: AtomicUsize,
}

impl InMemoryRemote {
    /// Creates an empty, reachable remote.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of `fetch` calls served so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of `replace` calls served so far.
    #[must_use]
    pub fn replace_count(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }

    /// Returns the stored document without counting it as a fetch.
    pub async fn document(&self, owner_id: &str, collection: Collection) -> Option<RemoteDocument> {
        self.documents
            .read()
            .await
            .get(&(owner_id.to_string(), collection))
            .cloned()
    }

    /// Seeds a document directly, bypassing availability simulation.
    pub async fn seed(&self, owner_id: &str, collection: Collection, items: Vec<serde_json::Value>) {
        self.documents.write().await.insert(
            (owner_id.to_string(), collection),
            RemoteDocument {
                items,
                last_synced: Utc::now(),
            },
        );
    }

    async fn simulate_network(&self) -> Result<(), LedgerError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::RemoteUnavailable(
                "remote store unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteGateway for InMemoryRemote {
    async fn fetch(
        &self,
        owner_id: &str,
        collection: Collection,
    ) -> Result<Option<RemoteDocument>, LedgerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        Ok(self.document(owner_id, collection).await)
    }

    async fn replace(
        &self,
        owner_id: &str,
        collection: Collection,
        items: Vec<serde_json::Value>,
        last_synced: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.replaces.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        self.documents.write().await.insert(
            (owner_id.to_string(), collection),
            RemoteDocument { items, last_synced },
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_document_is_none() {
        let remote = InMemoryRemote::new();
        assert!(matches!(remote.fetch("r1", Collection::Groups).await, Ok(None)));
        assert_eq!(remote.fetch_count(), 1);
    }

    #[tokio::test]
    async fn replace_then_fetch() {
        let remote = InMemoryRemote::new();
        let items = vec![serde_json::json!({"id": "g1"})];
        let result = remote
            .replace("r1", Collection::Groups, items.clone(), Utc::now())
            .await;
        assert!(result.is_ok());

        let Ok(Some(doc)) = remote.fetch("r1", Collection::Groups).await else {
            panic!("document expected");
        };
        assert_eq!(doc.items, items);
        assert!(matches!(remote.fetch("r1", Collection::Expenses).await, Ok(None)));
        assert!(matches!(remote.fetch("r2", Collection::Groups).await, Ok(None)));
    }

    #[tokio::test]
    async fn outage_fails_calls() {
        let remote = InMemoryRemote::new();
        remote.set_unavailable(true);
        assert!(matches!(
            remote.fetch("r1", Collection::Groups).await,
            Err(LedgerError::RemoteUnavailable(_))
        ));
        remote.set_unavailable(false);
        assert!(remote.fetch("r1", Collection::Groups).await.is_ok());
    }
}
