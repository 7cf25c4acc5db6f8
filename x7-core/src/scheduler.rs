//! Cancellable periodic background tasks.
//!
//! A [`PeriodicTask`] runs its tick closure on a fixed period, the first
//! tick immediately. Cancellation is checked at the top of every tick and
//! raced against the wait for the next one, so a cancelled task never
//! starts another tick. A tick already in flight runs to completion.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What the loop does after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stop,
}

pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl PeriodicTask {
    /// Spawn the loop on the current runtime.
    ///
    /// `tick` receives the task's token so long-running work can check it
    /// before publishing results.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Tick> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {}
                }
                if cancelled.is_cancelled() {
                    break;
                }
                if tick(cancelled.clone()).await == Tick::Stop {
                    break;
                }
            }
            debug!("{name} task stopped");
        });

        debug!("{name} task started, period {period:?}");
        Self {
            name,
            period,
            token,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop scheduling ticks. Does not interrupt a tick in flight.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
