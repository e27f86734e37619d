//! Batch fetch of the five read endpoints, coalesced so that at most one
//! batch is in flight and writing the store at any time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};

use super::api::{DashboardApi, Endpoint};
use super::controller::Core;
use super::error::{ApiError, Operation, SyncError};
use super::types::Snapshot;

type BatchResult = Result<Arc<Snapshot>, ApiError>;
type Flight = Shared<BoxFuture<'static, BatchResult>>;

/// The batch currently in flight, if any, and how many batches were launched.
#[derive(Default)]
pub(crate) struct FlightSlot {
    current: Mutex<Option<(u64, Flight)>>,
    launched: AtomicU64,
}

impl FlightSlot {
    fn lock(&self) -> MutexGuard<'_, Option<(u64, Flight)>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sequence number of the most recently launched batch.
    pub(crate) fn launched(&self) -> u64 {
        self.launched.load(Ordering::SeqCst)
    }
}

impl<A: DashboardApi> Core<A> {
    /// Operator- or timer-initiated refresh. Joins the in-flight batch when
    /// there is one.
    pub(crate) async fn refresh(self: &Arc<Self>) -> Result<Arc<Snapshot>, SyncError> {
        let _busy = self.store.begin_operation();
        let (_, flight) = self.join_or_launch();
        flight.await.map_err(|cause| {
            let err = SyncError::new(Operation::Refresh, cause);
            self.store.record_error(err.clone());
            err
        })
    }

    /// Waits for a batch launched after `floor`, so the result reflects
    /// remote state at least as new as the moment `floor` was read.
    pub(crate) async fn refresh_after(self: &Arc<Self>, floor: u64) -> BatchResult {
        loop {
            let (seq, flight) = self.join_or_launch();
            let result = flight.await;
            if seq > floor {
                return result;
            }
            log::debug!("batch #{} predates the request, fetching again", seq);
        }
    }

    fn join_or_launch(self: &Arc<Self>) -> (u64, Flight) {
        let mut slot = self.flights.lock();
        if let Some((seq, flight)) = slot.as_ref() {
            log::debug!("joining in-flight batch #{}", seq);
            return (*seq, flight.clone());
        }

        let seq = self.flights.launched.fetch_add(1, Ordering::SeqCst) + 1;
        let core = Arc::clone(self);
        let flight = async move {
            let result = core.fetch_batch().await.map(Arc::new);
            core.land(seq, &result);
            result
        }
        .boxed()
        .shared();

        *slot = Some((seq, flight.clone()));
        // Driven on its own task so the batch completes and clears the slot
        // even when every caller is dropped, e.g. by dispose aborting the poller.
        tokio::spawn(flight.clone());
        (seq, flight)
    }

    /// Issues the five reads concurrently; the first failure fails the batch.
    async fn fetch_batch(&self) -> Result<Snapshot, ApiError> {
        let api = &self.api;
        let (status, positions, logs, wallet, price) = tokio::try_join!(
            self.bounded(Endpoint::Status, api.status()),
            self.bounded(Endpoint::Positions, api.active_positions()),
            self.bounded(Endpoint::Logs, api.recent_logs(self.settings.logs_limit)),
            self.bounded(Endpoint::Wallet, api.wallet()),
            self.bounded(Endpoint::Price, api.price()),
        )?;
        Snapshot::assemble(status, positions, logs, wallet, price)
    }

    fn land(&self, seq: u64, result: &BatchResult) {
        match result {
            Ok(snapshot) => {
                if self.store.commit(Arc::clone(snapshot)) {
                    log::info!(
                        "batch #{} committed: running={} positions={} sol=${}",
                        seq,
                        snapshot.status.is_running,
                        snapshot.positions.len(),
                        snapshot.price.sol_price
                    );
                } else {
                    log::debug!("batch #{} discarded, store closed", seq);
                }
            }
            Err(err) => log::warn!("batch #{} rejected: {}", seq, err),
        }

        let mut slot = self.flights.lock();
        if matches!(slot.as_ref(), Some((current, _)) if *current == seq) {
            *slot = None;
        }
    }
}
