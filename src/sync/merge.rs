//! Remote-wins merge of local and remote collections.
//!
//! The merged collection starts from every local record; each remote
//! record then overwrites the local record with the same id, or is
//! appended if the id is new. Timestamps are not compared. Deletions are
//! not tombstoned, so a record deleted locally but still present remotely
//! comes back after the merge.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{Group, Record, RecordId};
use crate::error::LedgerError;

/// Merges `remote` into `local` by id, remote taking precedence.
///
/// Local order is kept; remote-only records follow in remote order.
#[must_use]
pub fn merge_by_id<R: Record>(local: Vec<R>, remote: Vec<R>) -> Vec<R> {
    let mut merged = local;
    let mut positions: HashMap<RecordId, usize> = merged
        .iter()
        .enumerate()
        .map(|(position, record)| (record.id().clone(), position))
        .collect();

    for record in remote {
        match positions.get(record.id()).and_then(|&p| merged.get_mut(p)) {
            Some(slot) => *slot = record,
            None => {
                positions.insert(record.id().clone(), merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

/// Resolves the active-group pointer: a remote pointer wins, otherwise the
/// local one is kept.
#[must_use]
pub fn merge_active(local: Option<Group>, remote: Option<Group>) -> Option<Group> {
    remote.or(local)
}

/// Decodes remote items as `R`, skipping anything that does not parse or
/// has no id.
#[must_use]
pub fn decode_items<R: Record>(items: Vec<serde_json::Value>) -> Vec<R> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<R>(item) {
            Ok(record) if !record.id().is_unassigned() => Some(record),
            Ok(_) => {
                tracing::warn!(collection = %R::COLLECTION, "skipping remote record without id");
                None
            }
            Err(e) => {
                tracing::warn!(collection = %R::COLLECTION, error = %e, "skipping undecodable remote record");
                None
            }
        })
        .collect()
}

/// Encodes records for a remote document.
///
/// # Errors
///
/// Returns [`LedgerError::Internal`] if a record cannot be serialized.
pub fn encode_items<T: Serialize>(records: &[T]) -> Result<Vec<serde_json::Value>, LedgerError> {
    records
        .iter()
        .map(|record| {
            serde_json::to_value(record)
                .map_err(|e| LedgerError::Internal(format!("cannot encode record: {e}")))
        })
        .collect()
}
