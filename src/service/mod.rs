//! Service layer: business logic orchestration.
//!
//! [`LedgerService`] validates mutations against their invariants, writes
//! them through the [`super::domain::RecordStore`], and answers settlement
//! queries by group id.

pub mod ledger_service;

pub use ledger_service::{GroupSummary, LedgerService};
