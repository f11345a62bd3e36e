//! Debounced pull-merge-push reconciliation between the local record store
//! and the remote document store.
//!
//! ```text
//!            trigger                 debounce elapsed + admitted
//!   Idle ───────────────► Debouncing ─────────────────────────► Syncing
//!    ▲                      │  ▲  trigger: re-arm                  │
//!    │   not admitted       │  └──┘                                │
//!    ├──────────────────────┘                                      │
//!    │                 finished (rerun queued: back to Debouncing) │
//!    └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! At most one reconciliation runs at a time per orchestrator. Triggers that
//! arrive while one is in flight are recorded and replayed as a fresh
//! debounce once it finishes. Writes made by reconciliation itself carry
//! [`ChangeOrigin::Sync`] and never schedule another run.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;

use super::gateway::RemoteGateway;
use super::merge::{decode_items, encode_items, merge_active, merge_by_id};
use super::timer::CancellableTimer;
use crate::domain::{
    ChangeOrigin, Collection, Expense, Group, Record, RecordStore, SyncPhase, SyncState,
    SyncStatus,
};
use crate::error::LedgerError;
use crate::identity::IdentityProvider;

/// Timing knobs of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period after the last trigger before reconciling.
    pub debounce: Duration,
    /// Navigation and periodic triggers are ignored if the last success is
    /// younger than this. Zero disables the guard.
    pub min_interval: Duration,
    /// Interval of the periodic trigger, if any.
    pub periodic_interval: Option<Duration>,
    /// Upper bound on every remote call.
    pub remote_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            min_interval: Duration::from_secs(30),
            periodic_interval: None,
            remote_timeout: Duration::from_secs(10),
        }
    }
}

/// What asked for a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// A local write to any collection.
    DataChange,
    /// The user opened a view that shows synced data.
    Navigation,
    /// The network came back while local changes were waiting.
    ConnectivityRestored,
    /// An explicit request that is still subject to debouncing.
    Manual,
    /// The periodic ticker.
    Periodic,
}

impl SyncTrigger {
    /// Triggers that carry unsynced work and so bypass the minimum
    /// interval guard.
    fn carries_changes(self) -> bool {
        matches!(
            self,
            Self::DataChange | Self::ConnectivityRestored | Self::Manual
        )
    }
}

/// Why a reconciliation was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Nobody is signed in.
    NotAuthenticated,
    /// The remote store is believed unreachable.
    Offline,
    /// The last success is younger than the minimum interval.
    RecentlySynced,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "not authenticated"),
            Self::Offline => write!(f, "offline"),
            Self::RecentlySynced => write!(f, "recently synced"),
        }
    }
}

/// Summary of one successful reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Groups stored after the merge.
    pub groups: usize,
    /// Expenses stored after the merge.
    pub expenses: usize,
    /// Whether an active group is set after the merge.
    pub has_active_group: bool,
    /// When the push completed.
    pub finished_at: DateTime<Utc>,
}

/// Result of [`SyncOrchestrator::force_sync`].
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The reconciliation ran to completion.
    Completed(ReconcileReport),
    /// The reconciliation was not admitted.
    Skipped(SkipReason),
    /// The reconciliation ran and failed.
    Failed(String),
    /// Another reconciliation is in flight.
    AlreadyInProgress,
}

/// Scheduling state guarded by one lock so phase transitions are atomic.
#[derive(Debug, Default)]
struct Machine {
    phase: SyncPhase,
    timer: CancellableTimer,
    /// Bumped on every arm so a stale timer callback can tell it lost.
    generation: u64,
    /// Unsynced changes exist since the last admitted run.
    dirty: bool,
    /// A trigger arrived while syncing.
    rerun: bool,
    /// Last connectivity seen by [`SyncOrchestrator::connectivity_changed`].
    online: bool,
}

#[derive(Debug)]
struct Inner {
    store: Arc<RecordStore>,
    remote: Arc<dyn RemoteGateway>,
    identity: Arc<dyn IdentityProvider>,
    config: SyncConfig,
    machine: Mutex<Machine>,
    state: RwLock<SyncState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    runs: AtomicU64,
}

/// Schedules and runs reconciliations for the signed-in user.
///
/// Cheap to clone; clones share one state machine.
///
/// Lock order is machine before state. Neither lock is held across an
/// `.await`.
#[derive(Debug, Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

impl SyncOrchestrator {
    /// Creates an idle orchestrator. Call [`start`](Self::start) to begin
    /// listening for changes.
    #[must_use]
    pub fn new(
        store: Arc<RecordStore>,
        remote: Arc<dyn RemoteGateway>,
        identity: Arc<dyn IdentityProvider>,
        config: SyncConfig,
    ) -> Self {
        let machine = Machine {
            online: identity.is_online(),
            ..Machine::default()
        };
        Self {
            inner: Arc::new(Inner {
                store,
                remote,
                identity,
                config,
                machine: Mutex::new(machine),
                state: RwLock::new(SyncState::default()),
                tasks: Mutex::new(Vec::new()),
                runs: AtomicU64::new(0),
            }),
        }
    }

    /// Restores the persisted sync status and spawns the change listener
    /// and, if configured, the periodic ticker.
    pub async fn start(&self) {
        match self.inner.store.load_sync_state().await {
            Ok(mut persisted) => {
                persisted.sync_in_progress = false;
                self.update_state(|state| *state = persisted);
            }
            Err(LedgerError::NotAuthenticated) => {}
            Err(e) => tracing::warn!(error = %e, "cannot restore sync status"),
        }

        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        tasks.push(self.spawn_listener());
        if let Some(period) = self.inner.config.periodic_interval {
            tasks.push(self.spawn_periodic(period));
        }
        tracing::info!(
            debounce_ms = self.inner.config.debounce.as_millis(),
            min_interval_secs = self.inner.config.min_interval.as_secs(),
            periodic = ?self.inner.config.periodic_interval,
            "sync orchestrator started"
        );
    }

    /// Stops background tasks, cancels any pending debounce and resets the
    /// in-memory status. A reconciliation already in flight runs to
    /// completion.
    pub fn shutdown(&self) {
        {
            let mut machine = self.lock_machine();
            machine.timer.cancel();
            let online = machine.online;
            *machine = Machine {
                online,
                ..Machine::default()
            };
        }
        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
        self.update_state(|state| *state = SyncState::default());
        tracing::info!("sync orchestrator stopped");
    }

    /// Requests a debounced reconciliation.
    ///
    /// Idle or debouncing: (re)arms the debounce. Syncing: queues one more
    /// run for when the current one finishes.
    pub fn request_sync(&self, trigger: SyncTrigger) {
        let online = self.inner.identity.is_online();
        let mut machine = self.lock_machine();
        if trigger.carries_changes() {
            machine.dirty = true;
        }
        if trigger == SyncTrigger::DataChange && !online {
            self.update_state(|state| state.pending_local_changes_since_offline = true);
        }

        match machine.phase {
            SyncPhase::Syncing => {
                machine.rerun = true;
                tracing::debug!(?trigger, "sync in flight, rerun queued");
            }
            SyncPhase::Idle | SyncPhase::Debouncing => {
                machine.phase = SyncPhase::Debouncing;
                self.arm_debounce(&mut machine);
                tracing::debug!(?trigger, "sync debounce armed");
            }
        }
    }

    /// Shorthand for a [`SyncTrigger::Navigation`] request.
    pub fn notify_navigation(&self) {
        self.request_sync(SyncTrigger::Navigation);
    }

    /// Reconciles now, skipping the debounce and the minimum interval guard.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotAuthenticated`] when nobody is signed in.
    /// Every other problem is reported through the [`SyncOutcome`].
    pub async fn force_sync(&self) -> Result<SyncOutcome, LedgerError> {
        let admission = {
            let mut machine = self.lock_machine();
            if machine.phase == SyncPhase::Syncing {
                return Ok(SyncOutcome::AlreadyInProgress);
            }
            machine.timer.cancel();
            machine.generation = machine.generation.wrapping_add(1);
            machine.dirty = true;
            let admission = self.admit(&machine, true);
            match admission {
                Ok(()) => self.enter_syncing(&mut machine),
                Err(reason) => self.enter_idle_skipped(&mut machine, reason),
            }
            admission
        };

        match admission {
            Err(SkipReason::NotAuthenticated) => Err(LedgerError::NotAuthenticated),
            Err(reason) => {
                if reason == SkipReason::Offline {
                    self.persist_state().await;
                }
                Ok(SyncOutcome::Skipped(reason))
            }
            Ok(()) => Ok(match self.run_reconciliation().await {
                Ok(report) => SyncOutcome::Completed(report),
                Err(e) => SyncOutcome::Failed(e.to_string()),
            }),
        }
    }

    /// Records a connectivity change. Going back online with local changes
    /// made while offline requests a reconciliation.
    pub fn connectivity_changed(&self, online: bool) {
        let restored = {
            let mut machine = self.lock_machine();
            let was_online = std::mem::replace(&mut machine.online, online);
            online && !was_online
        };
        tracing::info!(online, "connectivity changed");
        if restored && self.status().pending_local_changes_since_offline {
            self.request_sync(SyncTrigger::ConnectivityRestored);
        }
    }

    /// Current sync status.
    #[must_use]
    pub fn status(&self) -> SyncState {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current scheduling phase.
    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.lock_machine().phase
    }

    /// Number of reconciliations started since creation.
    #[must_use]
    pub fn reconciliation_count(&self) -> u64 {
        self.inner.runs.load(Ordering::SeqCst)
    }

    /// Timing configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    fn spawn_listener(&self) -> JoinHandle<()> {
        let mut events = self.inner.store.subscribe();
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let local = match events.recv().await {
                    Ok(event) => event.origin == ChangeOrigin::Local,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "sync listener lagged behind change events");
                        true
                    }
                    Err(RecvError::Closed) => break,
                };
                if !local {
                    continue;
                }
                let Some(inner) = weak.upgrade() else { break };
                SyncOrchestrator { inner }.request_sync(SyncTrigger::DataChange);
            }
        })
    }

    fn spawn_periodic(&self, period: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                SyncOrchestrator { inner }.request_sync(SyncTrigger::Periodic);
            }
        })
    }

    fn arm_debounce(&self, machine: &mut Machine) {
        machine.generation = machine.generation.wrapping_add(1);
        let generation = machine.generation;
        let weak = Arc::downgrade(&self.inner);
        machine.timer.arm(self.inner.config.debounce, move || {
            if let Some(inner) = weak.upgrade() {
                tokio::spawn(SyncOrchestrator { inner }.begin_debounced_sync(generation));
            }
        });
    }

    async fn begin_debounced_sync(self, generation: u64) {
        let admission = {
            let mut machine = self.lock_machine();
            if machine.phase != SyncPhase::Debouncing || machine.generation != generation {
                return;
            }
            let admission = self.admit(&machine, false);
            match admission {
                Ok(()) => self.enter_syncing(&mut machine),
                Err(reason) => self.enter_idle_skipped(&mut machine, reason),
            }
            admission
        };

        match admission {
            Ok(()) => {
                if let Err(e) = self.run_reconciliation().await {
                    tracing::debug!(error = %e, "debounced sync failed");
                }
            }
            Err(reason) => {
                tracing::debug!(%reason, "debounced sync skipped");
                if reason == SkipReason::Offline {
                    self.persist_state().await;
                }
            }
        }
    }

    /// Admission check. The caller holds the machine lock.
    fn admit(&self, machine: &Machine, forced: bool) -> Result<(), SkipReason> {
        let identity = &self.inner.identity;
        if !identity.is_authenticated() || identity.current_user_id().is_none() {
            return Err(SkipReason::NotAuthenticated);
        }
        if !identity.is_online() {
            return Err(SkipReason::Offline);
        }
        let min_interval = self.inner.config.min_interval;
        if !forced && !machine.dirty && !min_interval.is_zero() {
            let min_interval =
                chrono::Duration::from_std(min_interval).unwrap_or(chrono::Duration::MAX);
            if self.status().synced_within(min_interval, Utc::now()) {
                return Err(SkipReason::RecentlySynced);
            }
        }
        Ok(())
    }

    /// Returns to idle after a refused admission. Unsynced changes refused
    /// for being offline are flagged so reconnecting replays them.
    fn enter_idle_skipped(&self, machine: &mut Machine, reason: SkipReason) {
        machine.phase = SyncPhase::Idle;
        if reason == SkipReason::Offline && machine.dirty {
            self.update_state(|state| state.pending_local_changes_since_offline = true);
        }
    }

    fn enter_syncing(&self, machine: &mut Machine) {
        machine.phase = SyncPhase::Syncing;
        machine.rerun = false;
        machine.dirty = false;
        self.update_state(|state| {
            state.sync_in_progress = true;
            state.status = SyncStatus::Pending;
        });
    }

    async fn run_reconciliation(&self) -> Result<ReconcileReport, LedgerError> {
        self.inner.runs.fetch_add(1, Ordering::SeqCst);
        let result = self.reconcile().await;
        self.finish(&result).await;
        result
    }

    async fn finish(&self, result: &Result<ReconcileReport, LedgerError>) {
        {
            let mut machine = self.lock_machine();
            machine.phase = SyncPhase::Idle;
            if result.is_err() {
                machine.dirty = true;
            }
            self.update_state(|state| {
                state.sync_in_progress = false;
                match result {
                    Ok(report) => {
                        state.last_sync_timestamp = Some(report.finished_at);
                        state.status = SyncStatus::Synced;
                        state.last_error = None;
                        state.pending_local_changes_since_offline = false;
                    }
                    Err(e) => {
                        state.status = SyncStatus::Error;
                        state.last_error = Some(e.to_string());
                    }
                }
            });
            if machine.rerun {
                machine.rerun = false;
                machine.phase = SyncPhase::Debouncing;
                self.arm_debounce(&mut machine);
            }
        }

        match result {
            Ok(report) => tracing::info!(
                groups = report.groups,
                expenses = report.expenses,
                "reconciliation completed"
            ),
            Err(e) => tracing::warn!(error = %e, "reconciliation failed"),
        }
        self.persist_state().await;
    }

    /// Pull, merge, write back and push each collection in turn.
    async fn reconcile(&self) -> Result<ReconcileReport, LedgerError> {
        let user = self
            .inner
            .identity
            .current_user()
            .ok_or(LedgerError::NotAuthenticated)?;
        let owner = user.remote_owner_id();
        tracing::debug!(user_id = %user.id, owner, "reconciling");

        let groups = self.reconcile_collection::<Group>(owner).await?;
        let expenses = self.reconcile_collection::<Expense>(owner).await?;
        let has_active_group = self.reconcile_active(owner).await?;

        Ok(ReconcileReport {
            groups,
            expenses,
            has_active_group,
            finished_at: Utc::now(),
        })
    }

    async fn reconcile_collection<R: Record>(&self, owner: &str) -> Result<usize, LedgerError> {
        let document = self
            .remote_call(self.inner.remote.fetch(owner, R::COLLECTION))
            .await?;
        let remote: Vec<R> = document
            .map(|doc| decode_items(doc.items))
            .unwrap_or_default();

        let merged = self
            .inner
            .store
            .update_all::<R>(ChangeOrigin::Sync, |local| merge_by_id(local, remote))
            .await?;

        let items = encode_items(&merged)?;
        self.remote_call(
            self.inner
                .remote
                .replace(owner, R::COLLECTION, items, Utc::now()),
        )
        .await?;
        Ok(merged.len())
    }

    async fn reconcile_active(&self, owner: &str) -> Result<bool, LedgerError> {
        let document = self
            .remote_call(self.inner.remote.fetch(owner, Collection::ActiveGroup))
            .await?;
        let remote = document.and_then(|doc| decode_items::<Group>(doc.items).into_iter().next());

        let merged = self
            .inner
            .store
            .update_active(ChangeOrigin::Sync, |local| merge_active(local, remote))
            .await?;

        let items = encode_items(merged.as_slice())?;
        self.remote_call(self.inner.remote.replace(
            owner,
            Collection::ActiveGroup,
            items,
            Utc::now(),
        ))
        .await?;
        Ok(merged.is_some())
    }

    async fn remote_call<T>(
        &self,
        call: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        let limit = self.inner.config.remote_timeout;
        tokio::time::timeout(limit, call).await.map_err(|_| {
            LedgerError::RemoteUnavailable(format!(
                "remote call timed out after {}ms",
                limit.as_millis()
            ))
        })?
    }

    async fn persist_state(&self) {
        let snapshot = self.status();
        if let Err(e) = self.inner.store.save_sync_state(&snapshot).await {
            tracing::warn!(error = %e, "cannot persist sync status");
        }
    }

    fn update_state(&self, update: impl FnOnce(&mut SyncState)) {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        update(&mut state);
    }

    fn lock_machine(&self) -> MutexGuard<'_, Machine> {
        self.inner
            .machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventBus, RecordId};
    use crate::identity::SessionIdentity;
    use crate::persistence::{KeyValueStorage, MemoryStorage};
    use crate::sync::InMemoryRemote;

    struct Harness {
        orchestrator: SyncOrchestrator,
        store: Arc<RecordStore>,
        remote: Arc<InMemoryRemote>,
        identity: Arc<SessionIdentity>,
    }

    fn config() -> SyncConfig {
        SyncConfig {
            debounce: Duration::from_secs(1),
            min_interval: Duration::from_secs(30),
            periodic_interval: None,
            remote_timeout: Duration::from_secs(5),
        }
    }

    async fn harness_with(config: SyncConfig, online: bool) -> Harness {
        let identity = Arc::new(SessionIdentity::signed_in("u1", online));
        let store = Arc::new(RecordStore::new(
            Arc::new(MemoryStorage::new()) as Arc<dyn KeyValueStorage>,
            Arc::clone(&identity) as Arc<dyn IdentityProvider>,
            EventBus::new(256),
        ));
        let remote = Arc::new(InMemoryRemote::new());
        let orchestrator = SyncOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&remote) as Arc<dyn RemoteGateway>,
            Arc::clone(&identity) as Arc<dyn IdentityProvider>,
            config,
        );
        orchestrator.start().await;
        Harness {
            orchestrator,
            store,
            remote,
            identity,
        }
    }

    async fn harness() -> Harness {
        harness_with(config(), true).await
    }

    fn group(name: &str) -> Group {
        Group::new(name, "EUR", vec!["A".into(), "B".into()])
    }

    async fn remote_group_count(h: &Harness) -> usize {
        h.remote
            .document("u1", Collection::Groups)
            .await
            .map_or(0, |doc| doc.items.len())
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_writes_coalesces_into_one_run() {
        let h = harness().await;
        for i in 0..5 {
            assert!(h.store.put(group(&format!("g{i}"))).await.is_ok());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(h.orchestrator.phase(), SyncPhase::Debouncing);
        assert_eq!(h.orchestrator.reconciliation_count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.orchestrator.reconciliation_count(), 1);
        assert_eq!(remote_group_count(&h).await, 5);

        // Write-backs from the run itself do not schedule another one.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.orchestrator.reconciliation_count(), 1);
        assert_eq!(h.orchestrator.phase(), SyncPhase::Idle);

        let status = h.orchestrator.status();
        assert_eq!(status.status, SyncStatus::Synced);
        assert!(status.last_sync_timestamp.is_some());
        assert!(!status.sync_in_progress);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_during_sync_queues_exactly_one_rerun() {
        let h = harness().await;
        h.remote.set_latency(Duration::from_millis(500));

        assert!(h.store.put(group("first")).await.is_ok());
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(h.orchestrator.phase(), SyncPhase::Syncing);
        assert!(h.orchestrator.status().sync_in_progress);

        assert!(matches!(
            h.orchestrator.force_sync().await,
            Ok(SyncOutcome::AlreadyInProgress)
        ));
        assert!(h.store.put(group("second")).await.is_ok());
        assert!(h.store.put(group("third")).await.is_ok());

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(h.orchestrator.reconciliation_count(), 2);
        assert_eq!(remote_group_count(&h).await, 3);
        assert_eq!(h.orchestrator.phase(), SyncPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn signed_out_user_is_never_reconciled() {
        let h = harness().await;
        h.identity.sign_out();

        h.orchestrator.request_sync(SyncTrigger::Manual);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.orchestrator.reconciliation_count(), 0);
        assert_eq!(h.orchestrator.phase(), SyncPhase::Idle);
        assert_eq!(h.remote.fetch_count(), 0);

        assert!(matches!(
            h.orchestrator.force_sync().await,
            Err(LedgerError::NotAuthenticated)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn offline_changes_sync_when_connectivity_returns() {
        let h = harness_with(config(), false).await;
        assert!(h.store.put(group("offline")).await.is_ok());
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(h.orchestrator.reconciliation_count(), 0);
        assert!(h.orchestrator.status().pending_local_changes_since_offline);

        h.identity.set_online(true);
        h.orchestrator.connectivity_changed(true);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(h.orchestrator.reconciliation_count(), 1);
        let status = h.orchestrator.status();
        assert!(!status.pending_local_changes_since_offline);
        assert_eq!(status.status, SyncStatus::Synced);
        assert_eq!(remote_group_count(&h).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn forced_sync_refused_offline_still_replays_on_reconnect() {
        let h = harness().await;
        assert!(h.store.put(group("in flight")).await.is_ok());
        tokio::time::sleep(Duration::from_millis(100)).await;

        h.identity.set_online(false);
        h.orchestrator.connectivity_changed(false);
        assert!(matches!(
            h.orchestrator.force_sync().await,
            Ok(SyncOutcome::Skipped(SkipReason::Offline))
        ));
        assert_eq!(h.orchestrator.phase(), SyncPhase::Idle);
        assert!(h.orchestrator.status().pending_local_changes_since_offline);

        h.identity.set_online(true);
        h.orchestrator.connectivity_changed(true);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(h.orchestrator.reconciliation_count(), 1);
        assert_eq!(remote_group_count(&h).await, 1);
        assert!(!h.orchestrator.status().pending_local_changes_since_offline);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_without_pending_changes_does_nothing() {
        let h = harness_with(config(), false).await;
        h.identity.set_online(true);
        h.orchestrator.connectivity_changed(true);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.orchestrator.reconciliation_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_sets_error_and_next_trigger_retries() {
        let h = harness().await;
        h.remote.set_unavailable(true);

        let Ok(SyncOutcome::Failed(message)) = h.orchestrator.force_sync().await else {
            panic!("sync against an unreachable remote should fail");
        };
        let status = h.orchestrator.status();
        assert_eq!(status.status, SyncStatus::Error);
        assert_eq!(status.last_error.as_deref(), Some(message.as_str()));
        assert!(status.last_sync_timestamp.is_none());
        assert_eq!(h.orchestrator.phase(), SyncPhase::Idle);

        h.remote.set_unavailable(false);
        assert!(matches!(
            h.orchestrator.force_sync().await,
            Ok(SyncOutcome::Completed(_))
        ));
        let status = h.orchestrator.status();
        assert_eq!(status.status, SyncStatus::Synced);
        assert!(status.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_respects_minimum_interval_but_force_does_not() {
        let h = harness().await;
        assert!(matches!(
            h.orchestrator.force_sync().await,
            Ok(SyncOutcome::Completed(_))
        ));

        h.orchestrator.notify_navigation();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.orchestrator.reconciliation_count(), 1);

        assert!(matches!(
            h.orchestrator.force_sync().await,
            Ok(SyncOutcome::Completed(_))
        ));
        assert_eq!(h.orchestrator.reconciliation_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn data_change_bypasses_minimum_interval() {
        let h = harness().await;
        assert!(h.orchestrator.force_sync().await.is_ok());

        assert!(h.store.put(group("after")).await.is_ok());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.orchestrator.reconciliation_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_record_overwrites_local_with_same_id() {
        let h = harness().await;
        let mut local = group("Local");
        local.id = RecordId::new("g1");
        assert!(h.store.put(local).await.is_ok());

        let mut remote = group("Remote");
        remote.id = RecordId::new("g1");
        let Ok(item) = serde_json::to_value(&remote) else {
            panic!("encode failed");
        };
        h.remote.seed("u1", Collection::Groups, vec![item]).await;

        assert!(h.orchestrator.force_sync().await.is_ok());
        let Ok(groups) = h.store.list::<Group>().await else {
            panic!("list failed");
        };
        assert_eq!(groups.len(), 1);
        assert!(groups.iter().all(|g| g.name == "Remote"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_remote_times_out() {
        let h = harness().await;
        h.remote.set_latency(Duration::from_secs(60));
        assert!(matches!(
            h.orchestrator.force_sync().await,
            Ok(SyncOutcome::Failed(_))
        ));
        assert_eq!(h.orchestrator.status().status, SyncStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_debounce() {
        let h = harness().await;
        assert!(h.store.put(group("pending")).await.is_ok());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.orchestrator.phase(), SyncPhase::Debouncing);

        h.orchestrator.shutdown();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(h.orchestrator.reconciliation_count(), 0);
        assert_eq!(h.orchestrator.phase(), SyncPhase::Idle);
        assert_eq!(h.orchestrator.status(), SyncState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_ticker_requests_syncs() {
        let config = SyncConfig {
            min_interval: Duration::ZERO,
            periodic_interval: Some(Duration::from_secs(60)),
            ..config()
        };
        let h = harness_with(config, true).await;
        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(h.orchestrator.reconciliation_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn status_survives_restart() {
        let h = harness().await;
        assert!(h.orchestrator.force_sync().await.is_ok());
        let before = h.orchestrator.status();

        let restarted = SyncOrchestrator::new(
            Arc::clone(&h.store),
            Arc::clone(&h.remote) as Arc<dyn RemoteGateway>,
            Arc::clone(&h.identity) as Arc<dyn IdentityProvider>,
            config(),
        );
        restarted.start().await;
        assert_eq!(restarted.status(), before);
    }
}
