//! Interval-driven refresher.
//!
//! ```text
//! start(interval, refresh)
//!     │
//!     └─► spawn ──► tick (immediate) ──► refresh().await ──► tick ──► ...
//!                        ▲                                     │
//!                        └──────── select! cancelled ◄─────────┘
//! ```
//!
//! Only one timer runs per poller. Starting again stops the previous task
//! first, and dropping the poller stops it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::api::BoxFuture;

/// Default refresh interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;

/// Refresh callback shared by the timer task and manual refreshes.
pub type RefreshFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as a [`RefreshFn`].
pub fn refresh_fn<F, Fut>(f: F) -> RefreshFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
    refresh: RefreshFn,
}

/// Periodic refresh timer.
#[derive(Default)]
pub struct Poller {
    running: Mutex<Option<Running>>,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking every `interval`, stopping any previous timer first.
    ///
    /// The first tick fires immediately. `parent`, when given, cancels the
    /// timer along with everything else the owner runs.
    pub fn start(&self, interval: Duration, refresh: RefreshFn, parent: Option<&CancellationToken>) {
        let mut running = self.running.lock();
        if let Some(previous) = running.take() {
            debug!("Restarting poller, stopping previous timer");
            previous.token.cancel();
        }

        let token = match parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let task_token = token.clone();
        let task_refresh = Arc::clone(&refresh);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        trace!("Poll tick");
                        tokio::select! {
                            biased;
                            _ = task_token.cancelled() => break,
                            _ = (task_refresh)() => {}
                        }
                    }
                }
            }
            debug!("Poller stopped");
        });

        debug!(interval_ms = interval.as_millis() as u64, "Poller started");
        *running = Some(Running {
            token,
            handle,
            refresh,
        });
    }

    /// Stop the timer. Idempotent.
    pub fn stop(&self) {
        if let Some(running) = self.running.lock().take() {
            running.token.cancel();
            running.handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.token.is_cancelled() && !r.handle.is_finished())
    }

    /// Run the refresh once, out of band. The timer keeps its schedule.
    ///
    /// Returns `false` when the poller is not running.
    pub async fn refresh_now(&self) -> bool {
        let refresh = match self.running.lock().as_ref() {
            Some(running) if !running.token.is_cancelled() => Arc::clone(&running.refresh),
            _ => return false,
        };
        refresh().await;
        true
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("running", &self.is_running())
            .finish()
    }
}
