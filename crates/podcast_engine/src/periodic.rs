use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A cancellable repeating timer running on the tokio runtime.
///
/// The first tick fires one full period after `start`. Late ticks are
/// delayed rather than bunched, so a slow callback never causes a burst.
/// Dropping the task stops it.
pub struct PeriodicTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    period: Duration,
}

impl PeriodicTask {
    /// Spawns the timer. Must be called from within a tokio runtime.
    pub fn start<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => on_tick(),
                }
            }
        });
        Self {
            cancel,
            handle,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stops future ticks. Calling it again is harmless.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
