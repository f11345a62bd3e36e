//! Lifetime of one signed-in user's ledger.
//!
//! A [`LedgerSession`] is built explicitly at sign-in and consumed at
//! sign-out. It wires the record store, the ledger service and the sync
//! orchestrator together over one event bus.

use std::sync::Arc;

use crate::domain::{EventBus, RecordStore};
use crate::error::LedgerError;
use crate::identity::{IdentityProvider, SessionIdentity};
use crate::persistence::KeyValueStorage;
use crate::service::LedgerService;
use crate::sync::{RemoteGateway, SyncConfig, SyncOrchestrator};

/// Everything a signed-in user's ledger needs, with one owner.
#[derive(Debug)]
pub struct LedgerSession {
    identity: Arc<SessionIdentity>,
    store: Arc<RecordStore>,
    service: LedgerService,
    sync: SyncOrchestrator,
}

impl LedgerSession {
    /// Builds the session and starts background sync.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] if `identity` is signed out.
    pub async fn start(
        identity: Arc<SessionIdentity>,
        storage: Arc<dyn KeyValueStorage>,
        remote: Arc<dyn RemoteGateway>,
        sync_config: SyncConfig,
        bus_capacity: usize,
    ) -> Result<Self, LedgerError> {
        let user_id = identity.require_user_id()?;

        let provider = Arc::clone(&identity) as Arc<dyn IdentityProvider>;
        let store = Arc::new(RecordStore::new(
            storage,
            Arc::clone(&provider),
            EventBus::new(bus_capacity),
        ));
        let service = LedgerService::new(Arc::clone(&store));
        let sync = SyncOrchestrator::new(Arc::clone(&store), remote, provider, sync_config);
        sync.start().await;

        tracing::info!(%user_id, online = identity.is_online(), "ledger session started");
        Ok(Self {
            identity,
            store,
            service,
            sync,
        })
    }

    /// Validated record operations and settlement queries.
    #[must_use]
    pub fn service(&self) -> &LedgerService {
        &self.service
    }

    /// Background reconciliation.
    #[must_use]
    pub fn sync(&self) -> &SyncOrchestrator {
        &self.sync
    }

    /// The record store backing this session.
    #[must_use]
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// The session identity.
    #[must_use]
    pub fn identity(&self) -> &Arc<SessionIdentity> {
        &self.identity
    }

    /// Records a connectivity change. Coming back online with changes made
    /// while offline schedules a reconciliation.
    pub fn set_online(&self, online: bool) {
        self.identity.set_online(online);
        self.sync.connectivity_changed(online);
    }

    /// Stops background work and resets sync state.
    pub fn shutdown(self) {
        self.sync.shutdown();
        tracing::info!(
            user_id = ?self.identity.current_user_id(),
            "ledger session stopped"
        );
    }
}
