//! # split-ledger
//!
//! Local-first shared expense ledger with background sync and settlement
//! netting.
//!
//! Every read and write goes to a per-user local record store. A sync
//! orchestrator watches the store's change events and, after a debounce
//! window, reconciles each collection with a remote store: pull, merge by
//! id with the remote version winning, write back locally, push the merged
//! set. The settlement engine turns a group's expenses into per-participant
//! balances and a short list of transfers that settles them.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── LedgerSession (session)
//!     │     ├── LedgerService (service/)
//!     │     └── SyncOrchestrator (sync/) ──► RemoteGateway
//!     │
//!     ├── RecordStore + EventBus (domain/)
//!     ├── Settlement engine (domain/settlement)
//!     │
//!     └── KeyValueStorage / PostgreSQL remote (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod identity;
pub mod persistence;
pub mod service;
pub mod session;
pub mod sync;
pub mod ws;
