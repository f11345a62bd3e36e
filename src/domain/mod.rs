//! Domain layer: records, the local record store, change notification,
//! sync status, and the settlement engine.
//!
//! This module contains the per-user data model (groups, expenses and the
//! active-group pointer), the [`RecordStore`] that persists it and emits
//! change events, and the pure settlement functions that turn a group's
//! expenses into balances and transfers.

pub mod change_event;
pub mod collection;
pub mod event_bus;
pub mod expense;
pub mod group;
pub mod record_id;
pub mod record_store;
pub mod settlement;
pub mod sync_state;

pub use change_event::{ChangeEvent, ChangeOrigin, CollectionSnapshot};
pub use collection::{Collection, Record};
pub use event_bus::EventBus;
pub use expense::Expense;
pub use group::Group;
pub use record_id::RecordId;
pub use record_store::RecordStore;
pub use settlement::{Balances, ParticipantBalance, Transfer};
pub use sync_state::{SyncPhase, SyncState, SyncStatus};
