//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::LedgerService;
use crate::session::LedgerSession;
use crate::sync::SyncOrchestrator;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The ledger session served by this process.
    pub session: Arc<LedgerSession>,
}

impl AppState {
    /// Wraps a started session.
    #[must_use]
    pub fn new(session: Arc<LedgerSession>) -> Self {
        Self { session }
    }

    /// Ledger service for record operations and settlement queries.
    #[must_use]
    pub fn service(&self) -> &LedgerService {
        self.session.service()
    }

    /// Sync orchestrator of the session.
    #[must_use]
    pub fn sync(&self) -> &SyncOrchestrator {
        self.session.sync()
    }
}
