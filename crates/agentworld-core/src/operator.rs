//! Control state shared by the tick loop and the transport layer.
//!
//! All mutable control fields are atomics, so the scheduler reads them on
//! every iteration without taking a lock, and request handlers flip them
//! without waiting on a tick in progress.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use crate::error::TickError;

/// Run flag, tick interval, and tick counter.
#[derive(Debug)]
pub struct ControlState {
    /// Whether ticks perform work.
    running: AtomicBool,

    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Ticks that have performed work.
    tick: AtomicU64,

    /// Wakes a scheduler that is currently waiting. No permit is stored,
    /// so a change made mid-tick never cuts the next interval short.
    wake: Notify,

    /// Wall-clock time the control state was created.
    started_at: DateTime<Utc>,
}

impl ControlState {
    /// New control state. The simulation starts stopped.
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            running: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms.max(1)),
            tick: AtomicU64::new(0),
            wake: Notify::new(),
            started_at: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Start / Stop
    // -----------------------------------------------------------------------

    /// Whether ticks currently perform work.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Let the next tick perform work. Returns the previous state.
    pub fn start(&self) -> bool {
        let was = self.running.swap(true, Ordering::AcqRel);
        self.wake.notify_waiters();
        was
    }

    /// Make subsequent ticks idle. In-flight generation calls still finish
    /// and commit. Returns the previous state.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval in milliseconds.
    ///
    /// Returns the previous interval, or `None` if `ms` is zero. Range
    /// limits for user input are enforced by the transport.
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms == 0 {
            return None;
        }
        let prev = self.tick_interval_ms.swap(ms, Ordering::AcqRel);
        self.wake.notify_waiters();
        Some(prev)
    }

    // -----------------------------------------------------------------------
    // Tick counter
    // -----------------------------------------------------------------------

    /// Ticks that have performed work.
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Count one working tick and return its number.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::TickOverflow`] if the counter is exhausted.
    pub fn advance_tick(&self) -> Result<u64, TickError> {
        let prev = self
            .tick
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| t.checked_add(1))
            .map_err(|current| {
                tracing::error!(tick = current, "tick counter exhausted");
                TickError::TickOverflow
            })?;
        prev.checked_add(1).ok_or(TickError::TickOverflow)
    }

    // -----------------------------------------------------------------------
    // Scheduler wake-up
    // -----------------------------------------------------------------------

    /// Resolves when a control change asks the scheduler to re-check.
    pub async fn changed(&self) {
        self.wake.notified().await;
    }

    /// Wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
