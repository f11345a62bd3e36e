//! Per-user durable record storage with change notification.
//!
//! [`RecordStore`] keeps three collections per user (groups, expenses and
//! the active-group pointer), each serialized as one JSON value under
//! `"{user_id}/{collection}"` in a [`KeyValueStorage`]. Every mutation is
//! written durably and then published on the [`EventBus`] before the call
//! returns, so a subscriber that reads right after being notified observes
//! the write.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, broadcast};

use super::collection::Record;
use super::{
    ChangeEvent, ChangeOrigin, Collection, CollectionSnapshot, EventBus, Group, RecordId, SyncState,
};
use crate::error::LedgerError;
use crate::identity::IdentityProvider;
use crate::persistence::KeyValueStorage;

/// Storage key suffix of the persisted sync status.
const SYNC_STATUS_KEY: &str = "sync_status";

/// Local record store partitioned by user id and collection.
///
/// # Concurrency
///
/// - Reads go straight to storage and never block on writers.
/// - Mutations are serialized by one async mutex held across the
///   read-modify-write, the durable write and the notification, so
///   notifications are delivered in write order.
/// - Two conflicting writes in quick succession resolve last-write-wins.
#[derive(Debug)]
pub struct RecordStore {
    storage: Arc<dyn KeyValueStorage>,
    identity: Arc<dyn IdentityProvider>,
    event_bus: EventBus,
    write_lock: Mutex<()>,
}

impl RecordStore {
    /// Creates a store over `storage`, resolving users through `identity`.
    #[must_use]
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        identity: Arc<dyn IdentityProvider>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            storage,
            identity,
            event_bus,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the bus change notifications are published on.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Registers a new change listener.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.event_bus.subscribe()
    }

    /// Returns the storage key of `collection` for `user_id`.
    #[must_use]
    pub fn storage_key(user_id: &str, collection: &str) -> String {
        format!("{user_id}/{collection}")
    }

    /// Lists every record of type `R`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be read.
    pub async fn list<R: Record>(&self) -> Result<Vec<R>, LedgerError> {
        let user_id = self.identity.require_user_id()?;
        self.load(&user_id, R::COLLECTION.as_str()).await
    }

    /// Fetches one record by id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be read.
    pub async fn get<R: Record>(&self, id: &RecordId) -> Result<Option<R>, LedgerError> {
        let records: Vec<R> = self.list().await?;
        Ok(records.into_iter().find(|r| r.id() == id))
    }

    /// Inserts or updates a record and returns the stored version.
    ///
    /// An unassigned id gets a fresh one, and `created_by`/`created_at` are
    /// stamped. An id that is already stored is updated in place and keeps
    /// its original creation stamps. An unknown assigned id is inserted
    /// verbatim, stamped only if it carries no owner.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be read or written.
    pub async fn put<R: Record>(&self, mut record: R) -> Result<R, LedgerError> {
        let user_id = self.identity.require_user_id()?;
        let _guard = self.write_lock.lock().await;

        let mut records: Vec<R> = self.load(&user_id, R::COLLECTION.as_str()).await?;
        if record.id().is_unassigned() {
            record.set_id(RecordId::generate());
            record.stamp_creation(&user_id, Utc::now());
            records.push(record.clone());
        } else if let Some(existing) = records.iter_mut().find(|r| r.id() == record.id()) {
            record.inherit_creation(existing);
            *existing = record.clone();
        } else {
            if record.owner().is_empty() {
                record.stamp_creation(&user_id, Utc::now());
            }
            records.push(record.clone());
        }

        self.commit(&user_id, records, ChangeOrigin::Local).await?;
        Ok(record)
    }

    /// Deletes a record by id. Returns `false` if it did not exist; no
    /// notification is published in that case.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be read or written.
    pub async fn delete<R: Record>(&self, id: &RecordId) -> Result<bool, LedgerError> {
        Ok(self.delete_where::<R>(|r| r.id() == id).await? > 0)
    }

    /// Deletes every record matching `predicate` in one write and one
    /// notification. Returns the number of removed records.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be read or written.
    pub async fn delete_where<R: Record>(
        &self,
        predicate: impl Fn(&R) -> bool,
    ) -> Result<usize, LedgerError> {
        let user_id = self.identity.require_user_id()?;
        let _guard = self.write_lock.lock().await;

        let mut records: Vec<R> = self.load(&user_id, R::COLLECTION.as_str()).await?;
        let before = records.len();
        records.retain(|r| !predicate(r));
        let removed = before - records.len();
        if removed > 0 {
            self.commit(&user_id, records, ChangeOrigin::Local).await?;
        }
        Ok(removed)
    }

    /// Replaces the whole collection, as reconciliation does after a merge.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be written.
    pub async fn replace_all<R: Record>(
        &self,
        records: Vec<R>,
        origin: ChangeOrigin,
    ) -> Result<(), LedgerError> {
        let user_id = self.identity.require_user_id()?;
        let _guard = self.write_lock.lock().await;
        self.commit(&user_id, records, origin).await
    }

    /// Rewrites the collection from its current contents while holding the
    /// write lock, and returns what was written. Local writes racing with
    /// the rewrite are applied either before or after it, never lost.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be read or written.
    pub async fn update_all<R: Record>(
        &self,
        origin: ChangeOrigin,
        update: impl FnOnce(Vec<R>) -> Vec<R>,
    ) -> Result<Vec<R>, LedgerError> {
        let user_id = self.identity.require_user_id()?;
        let _guard = self.write_lock.lock().await;

        let records = update(self.load(&user_id, R::COLLECTION.as_str()).await?);
        self.commit(&user_id, records.clone(), origin).await?;
        Ok(records)
    }

    /// Points the active-group pointer at `group`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be written.
    pub async fn set_active(&self, group: Group) -> Result<(), LedgerError> {
        self.replace_active(Some(group), ChangeOrigin::Local).await
    }

    /// Returns the active group, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be read.
    pub async fn get_active(&self) -> Result<Option<Group>, LedgerError> {
        let user_id = self.identity.require_user_id()?;
        self.load_value(&user_id, Collection::ActiveGroup.as_str())
            .await
            .map(Option::flatten)
    }

    /// Clears the active-group pointer.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be written.
    pub async fn clear_active(&self) -> Result<(), LedgerError> {
        self.replace_active(None, ChangeOrigin::Local).await
    }

    /// Overwrites the active-group pointer and notifies subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be written.
    pub async fn replace_active(
        &self,
        group: Option<Group>,
        origin: ChangeOrigin,
    ) -> Result<(), LedgerError> {
        self.update_active(origin, |_| group).await.map(|_| ())
    }

    /// Rewrites the active-group pointer from its current value while
    /// holding the write lock, and returns what was written.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be read or written.
    pub async fn update_active(
        &self,
        origin: ChangeOrigin,
        update: impl FnOnce(Option<Group>) -> Option<Group>,
    ) -> Result<Option<Group>, LedgerError> {
        let user_id = self.identity.require_user_id()?;
        let _guard = self.write_lock.lock().await;

        let current: Option<Group> = self
            .load_value(&user_id, Collection::ActiveGroup.as_str())
            .await?
            .flatten();
        let group = update(current);
        self.store_value(&user_id, Collection::ActiveGroup.as_str(), &group)
            .await?;
        let _ = self.event_bus.publish(ChangeEvent::new(
            user_id,
            origin,
            CollectionSnapshot::ActiveGroup(group.clone()),
        ));
        Ok(group)
    }

    /// Loads the persisted sync status of the current user.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be read.
    pub async fn load_sync_state(&self) -> Result<SyncState, LedgerError> {
        let user_id = self.identity.require_user_id()?;
        self.load_value(&user_id, SYNC_STATUS_KEY)
            .await
            .map(Option::unwrap_or_default)
    }

    /// Persists the sync status of the current user. No notification.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when no user is signed in,
    /// or [`LedgerError::Storage`] if storage cannot be written.
    pub async fn save_sync_state(&self, state: &SyncState) -> Result<(), LedgerError> {
        let user_id = self.identity.require_user_id()?;
        self.store_value(&user_id, SYNC_STATUS_KEY, state).await
    }

    /// Writes a collection and publishes it. Caller holds the write lock.
    async fn commit<R: Record>(
        &self,
        user_id: &str,
        records: Vec<R>,
        origin: ChangeOrigin,
    ) -> Result<(), LedgerError> {
        self.store_value(user_id, R::COLLECTION.as_str(), &records)
            .await?;
        let receivers = self.event_bus.publish(ChangeEvent::new(
            user_id,
            origin,
            R::snapshot(records),
        ));
        tracing::debug!(%user_id, collection = %R::COLLECTION, ?origin, receivers, "collection written");
        Ok(())
    }

    async fn load<R: Record>(
        &self,
        user_id: &str,
        collection: &str,
    ) -> Result<Vec<R>, LedgerError> {
        self.load_value(user_id, collection)
            .await
            .map(Option::unwrap_or_default)
    }

    /// Reads and parses one key. Unparseable data is logged and treated as
    /// absent so one corrupt collection never takes the session down.
    async fn load_value<T: DeserializeOwned>(
        &self,
        user_id: &str,
        collection: &str,
    ) -> Result<Option<T>, LedgerError> {
        let key = Self::storage_key(user_id, collection);
        let Some(raw) = self.read_raw(key.clone()).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                let err = LedgerError::StorageCorrupt {
                    key,
                    reason: e.to_string(),
                };
                tracing::warn!(error = %err, "discarding unreadable collection");
                Ok(None)
            }
        }
    }

    async fn store_value<T: Serialize>(
        &self,
        user_id: &str,
        collection: &str,
        value: &T,
    ) -> Result<(), LedgerError> {
        let key = Self::storage_key(user_id, collection);
        let raw = serde_json::to_string(value)
            .map_err(|e| LedgerError::Internal(format!("cannot serialize {key}: {e}")))?;
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || storage.write(&key, &raw))
            .await
            .map_err(|e| LedgerError::Internal(format!("storage task failed: {e}")))?
    }

    /// Reads one key on the blocking pool.
    async fn read_raw(&self, key: String) -> Result<Option<String>, LedgerError> {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || storage.read(&key))
            .await
            .map_err(|e| LedgerError::Internal(format!("storage task failed: {e}")))?
    }
}
