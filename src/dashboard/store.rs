use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use super::error::SyncError;
use super::types::{DashboardState, Snapshot};

/// Last-known-good snapshot plus the transient busy/error flags.
///
/// Writes replace the snapshot wholesale; nothing is ever patched field by
/// field, so a poisoned lock still guards a complete state and is recovered.
pub struct StateStore {
    inner: Mutex<StoreInner>,
    revision: watch::Sender<u64>,
}

#[derive(Default)]
struct StoreInner {
    snapshot: Option<Arc<Snapshot>>,
    outstanding: usize,
    last_error: Option<SyncError>,
    closed: bool,
}

impl StateStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Mutex::new(StoreInner::default()),
            revision,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn touch(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Receiver whose value changes on every store mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Starts a new operator-visible operation: clears `last_error` and marks
    /// the store busy until the returned guard drops.
    pub fn begin_operation(&self) -> BusyGuard<'_> {
        {
            let mut guard = self.lock();
            if !guard.closed {
                guard.last_error = None;
            }
            guard.outstanding += 1;
        }
        self.touch();
        BusyGuard { store: self }
    }

    /// Replaces the five snapshot fields as one unit. Ignored once closed.
    pub fn commit(&self, snapshot: Arc<Snapshot>) -> bool {
        {
            let mut guard = self.lock();
            if guard.closed {
                return false;
            }
            guard.snapshot = Some(snapshot);
        }
        self.touch();
        true
    }

    pub fn record_error(&self, error: SyncError) {
        {
            let mut guard = self.lock();
            if guard.closed {
                return;
            }
            guard.last_error = Some(error);
        }
        self.touch();
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.lock().snapshot.clone()
    }

    pub fn last_error(&self) -> Option<SyncError> {
        self.lock().last_error.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().outstanding > 0
    }

    pub fn state(&self) -> DashboardState {
        let guard = self.lock();
        DashboardState {
            snapshot: guard.snapshot.clone(),
            busy: guard.outstanding > 0,
            last_error: guard.last_error.clone(),
        }
    }

    /// Tears the store down. Later commits and errors are discarded.
    pub fn close(&self) {
        {
            let mut guard = self.lock();
            guard.closed = true;
            guard.snapshot = None;
            guard.last_error = None;
        }
        self.touch();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the store busy for as long as it is alive.
pub struct BusyGuard<'a> {
    store: &'a StateStore,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        {
            let mut guard = self.store.lock();
            guard.outstanding = guard.outstanding.saturating_sub(1);
        }
        self.store.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::api::Endpoint;
    use crate::dashboard::error::{ApiError, Operation};
    use crate::dashboard::types::{BotStatus, PriceSnapshot, WalletInfo};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn snapshot(running: bool) -> Arc<Snapshot> {
        let status = BotStatus { is_running: running, active_positions: 0, last_check: None, last_action: None };
        let price = PriceSnapshot { sol_price: dec!(142.37), timestamp: Utc::now() };
        Arc::new(Snapshot::assemble(status, vec![], vec![], WalletInfo::unconfigured(), price).unwrap())
    }

    fn fetch_error() -> SyncError {
        SyncError::new(
            Operation::Refresh,
            ApiError::Transport { endpoint: Endpoint::Status, message: "connection refused".into() },
        )
    }

    #[test]
    fn busy_tracks_overlapping_operations() {
        let store = StateStore::new();
        assert!(!store.is_busy());
        let first = store.begin_operation();
        let second = store.begin_operation();
        drop(first);
        assert!(store.is_busy());
        drop(second);
        assert!(!store.is_busy());
    }

    #[test]
    fn new_operation_clears_previous_error() {
        let store = StateStore::new();
        store.record_error(fetch_error());
        assert!(store.last_error().is_some());

        let _op = store.begin_operation();
        assert!(store.last_error().is_none());
        assert!(store.is_busy());
    }

    #[test]
    fn subscribers_see_every_mutation() {
        let store = StateStore::new();
        let rx = store.subscribe();
        let before = *rx.borrow();
        store.commit(snapshot(false));
        assert_ne!(*rx.borrow(), before);
    }

    #[test]
    fn closed_store_discards_writes() {
        let store = StateStore::new();
        assert!(store.commit(snapshot(true)));
        store.close();
        assert!(store.snapshot().is_none());
        assert!(!store.commit(snapshot(false)));
        store.record_error(fetch_error());
        let state = store.state();
        assert!(state.snapshot.is_none());
        assert!(state.last_error.is_none());
    }
}
