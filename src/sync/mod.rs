//! Background reconciliation with the remote document store.
//!
//! - [`gateway`]: the remote store contract and an in-memory implementation.
//! - [`merge`]: remote-wins merging by record id.
//! - [`timer`]: the cancellable debounce timer.
//! - [`orchestrator`]: the debounced pull-merge-push state machine.

pub mod gateway;
pub mod merge;
pub mod orchestrator;
pub mod timer;

pub use gateway::{InMemoryRemote, RemoteDocument, RemoteGateway};
pub use orchestrator::{
    ReconcileReport, SkipReason, SyncConfig, SyncOrchestrator, SyncOutcome, SyncTrigger,
};
pub use timer::CancellableTimer;
