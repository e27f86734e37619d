use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Background task that runs a callback on a fixed period until cancelled.
///
/// The first tick fires immediately. Ticks are not gated on whether the
/// previous callback's work is still outstanding elsewhere; callers that need
/// coalescing do it themselves.
pub struct PollScheduler {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    period: Duration,
}

impl PollScheduler {
    /// Spawns the poll loop on the current tokio runtime.
    ///
    /// Panics if `period` is zero.
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let stop = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = on_tick() => {}
                }
            }
            log::debug!("poll loop stopped");
        });

        Self {
            token,
            task: Some(task),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Stops the loop and releases the timer. Returns `false` if it was
    /// already cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                self.token.cancel();
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
