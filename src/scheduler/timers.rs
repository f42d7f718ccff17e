//! Live reminder timers.
//!
//! [`TimerRegistry`] is the only owner of running timer tasks. Each reminder
//! id maps to at most one fire path: a tokio task that sleeps until the first
//! trigger, invokes the handler, then keeps invoking it on a fixed repeat
//! period. Arming an id always aborts its previous fire path first.
//!
//! Handlers run on the blocking pool: notification backends make
//! synchronous platform calls and must not hold up other timers.

use crate::error::{ReminderError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Which tick invoked a fire handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireKind {
    /// The one-shot timer armed with the computed delay.
    Initial,
    /// A tick of the repeating timer installed after the first fire.
    Repeat,
}

/// Where a fire path is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    /// Waiting on the one-shot delay.
    Armed,
    /// First fire handled, repeat ticks follow.
    Repeating,
}

/// Callback invoked on every tick of a fire path.
pub type FireHandler = Arc<dyn Fn(FireKind) + Send + Sync>;

struct FirePath {
    task: JoinHandle<()>,
    delay: Duration,
    fires: Arc<AtomicU64>,
}

/// Owns every live reminder timer, keyed by reminder id.
pub struct TimerRegistry {
    runtime: Handle,
    repeat_period: Duration,
    paths: HashMap<String, FirePath>,
}

impl TimerRegistry {
    /// Create a registry on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::Runtime`] when called outside a runtime.
    pub fn new(repeat_period: Duration) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| ReminderError::Runtime(format!("timers need a tokio runtime: {e}")))?;
        Ok(Self::with_handle(runtime, repeat_period))
    }

    /// Create a registry spawning onto `runtime`.
    #[must_use]
    pub fn with_handle(runtime: Handle, repeat_period: Duration) -> Self {
        Self {
            runtime,
            repeat_period,
            paths: HashMap::new(),
        }
    }

    /// Arm `id` to fire after `delay`, then every repeat period.
    ///
    /// Any existing fire path for `id` is cancelled first.
    pub fn arm(&mut self, id: &str, delay: Duration, on_fire: FireHandler) {
        if self.cancel(id) {
            debug!("re-arming reminder {id}");
        }

        let fires = Arc::new(AtomicU64::new(0));
        let completed = Arc::clone(&fires);
        let period = self.repeat_period;
        let reminder_id = id.to_owned();
        let first = Instant::now() + delay;

        let task = self.runtime.spawn(async move {
            tokio::time::sleep_until(first).await;
            debug!("reminder {reminder_id} fired");
            run_handler(&reminder_id, &on_fire, FireKind::Initial).await;
            completed.fetch_add(1, Ordering::AcqRel);

            let mut ticker = tokio::time::interval_at(first + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!("reminder {reminder_id} repeat tick");
                run_handler(&reminder_id, &on_fire, FireKind::Repeat).await;
                completed.fetch_add(1, Ordering::AcqRel);
            }
        });

        debug!("armed reminder {id} in {}ms", delay.as_millis());
        self.paths.insert(
            id.to_owned(),
            FirePath {
                task,
                delay,
                fires,
            },
        );
    }

    /// Cancel the fire path for `id`. Returns `true` when one existed.
    pub fn cancel(&mut self, id: &str) -> bool {
        match self.paths.remove(id) {
            Some(path) => {
                path.task.abort();
                debug!("cancelled timers for reminder {id}");
                true
            }
            None => false,
        }
    }

    /// Cancel every fire path. Returns how many were live.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.paths.len();
        for (_, path) in self.paths.drain() {
            path.task.abort();
        }
        count
    }

    /// Number of live fire paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` when nothing is armed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Returns `true` when `id` has a live fire path.
    #[must_use]
    pub fn is_armed(&self, id: &str) -> bool {
        self.paths.contains_key(id)
    }

    /// One-shot delay `id` was last armed with.
    #[must_use]
    pub fn armed_delay(&self, id: &str) -> Option<Duration> {
        self.paths.get(id).map(|path| path.delay)
    }

    /// Lifecycle phase of `id`'s fire path.
    #[must_use]
    pub fn phase(&self, id: &str) -> Option<TimerPhase> {
        self.fires(id).map(|fires| {
            if fires > 0 {
                TimerPhase::Repeating
            } else {
                TimerPhase::Armed
            }
        })
    }

    /// Completed handler invocations on `id`'s current fire path.
    #[must_use]
    pub fn fires(&self, id: &str) -> Option<u64> {
        self.paths
            .get(id)
            .map(|path| path.fires.load(Ordering::Acquire))
    }

    /// Ids with a live fire path, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.paths.keys().cloned().collect();
        ids.sort();
        ids
    }
}

async fn run_handler(id: &str, on_fire: &FireHandler, kind: FireKind) {
    let handler = Arc::clone(on_fire);
    if let Err(e) = tokio::task::spawn_blocking(move || handler(kind)).await {
        warn!("fire handler for reminder {id} failed: {e}");
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl std::fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("repeat_period", &self.repeat_period)
            .field("armed", &self.ids())
            .finish()
    }
}

/// Wait until `id` has completed `n` handler runs.
///
/// Handlers finish on the blocking pool, so a few yields are not enough.
#[cfg(test)]
pub(crate) async fn wait_for_fires(timers: &TimerRegistry, id: &str, n: u64) {
    for _ in 0..5_000 {
        if timers.fires(id).unwrap_or(0) >= n {
            return;
        }
        tokio::task::yield_now().await;
        std::thread::sleep(Duration::from_millis(1));
    }
    panic!("reminder {id} did not reach {n} fires");
}
