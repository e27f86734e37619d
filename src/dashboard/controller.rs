use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use super::api::{Command, CommandAck, DashboardApi, Endpoint, ServiceHealth};
use super::error::{ApiError, SyncError};
use super::fetch::FlightSlot;
use super::poll::PollScheduler;
use super::store::StateStore;
use super::types::{DashboardState, Snapshot};

/// Timing knobs for the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    /// Deadline applied to every individual remote call.
    pub request_timeout: Duration,
    pub logs_limit: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(5),
            logs_limit: 50,
        }
    }
}

/// State shared between the controller handle and its poll task.
pub(crate) struct Core<A> {
    pub(crate) api: A,
    pub(crate) store: StateStore,
    pub(crate) settings: SyncSettings,
    pub(crate) flights: FlightSlot,
}

impl<A: DashboardApi> Core<A> {
    pub(crate) async fn bounded<T, F>(&self, endpoint: Endpoint, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let after = self.settings.request_timeout;
        match tokio::time::timeout(after, call).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout { endpoint, after }),
        }
    }
}

/// Keeps the console's view of the bot in step with the remote service.
///
/// Created with [`SyncController::start`], which performs the first fetch
/// immediately and then polls on `poll_interval`. Dropping the controller
/// disposes it.
pub struct SyncController<A: DashboardApi> {
    core: Arc<Core<A>>,
    poller: Mutex<PollScheduler>,
}

impl<A: DashboardApi> SyncController<A> {
    /// Must be called from within a tokio runtime.
    pub fn start(api: A, settings: SyncSettings) -> Self {
        let core = Arc::new(Core {
            api,
            store: StateStore::new(),
            settings,
            flights: FlightSlot::default(),
        });

        let ticking = Arc::clone(&core);
        let poller = PollScheduler::spawn(settings.poll_interval, move || {
            let core = Arc::clone(&ticking);
            async move {
                if let Err(err) = core.refresh().await {
                    log::warn!("scheduled refresh failed: {}", err);
                }
            }
        });
        log::info!(
            "sync controller started, polling every {}s",
            settings.poll_interval.as_secs_f64()
        );

        Self {
            core,
            poller: Mutex::new(poller),
        }
    }

    pub fn settings(&self) -> SyncSettings {
        self.core.settings
    }

    /// Re-reads all five endpoints and replaces the snapshot on success.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, SyncError> {
        self.core.refresh().await
    }

    /// Sends `command`; start and stop are followed by one reconciling refresh
    /// whatever the command's outcome.
    pub async fn execute(&self, command: Command) -> Result<CommandAck, SyncError> {
        self.core.execute(command).await
    }

    pub async fn start_bot(&self) -> Result<CommandAck, SyncError> {
        self.execute(Command::Start).await
    }

    pub async fn stop_bot(&self) -> Result<CommandAck, SyncError> {
        self.execute(Command::Stop).await
    }

    pub async fn test_notification(&self) -> Result<CommandAck, SyncError> {
        self.execute(Command::TestNotification).await
    }

    /// Service banner; does not touch the store.
    pub async fn health(&self) -> Result<ServiceHealth, ApiError> {
        self.core.bounded(Endpoint::Health, self.core.api.health()).await
    }

    pub fn state(&self) -> DashboardState {
        self.core.store.state()
    }

    /// Receiver that changes whenever the store does.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.core.store.subscribe()
    }

    pub fn is_disposed(&self) -> bool {
        self.core.store.is_closed()
    }

    /// Stops polling and tears the store down. Calls after the first are no-ops
    /// and return `false`.
    pub fn dispose(&self) -> bool {
        let cancelled = self
            .poller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .cancel();
        if cancelled {
            self.core.store.close();
            log::info!("sync controller disposed");
        }
        cancelled
    }
}

impl<A: DashboardApi> Drop for SyncController<A> {
    fn drop(&mut self) {
        self.dispose();
    }
}
