//! The tick scheduler.
//!
//! [`run_scheduler`] drives the simulation until shutdown is signalled:
//!
//! - **Running**: each iteration runs one tick, then sleeps for the
//!   current interval.
//! - **Stopped**: the loop keeps its cadence but does no work.
//! - **Tick failure**: logged, followed by a one-second backoff. The loop
//!   itself never fails.
//!
//! Each tick runs in its own task so that even a panic inside a tick is
//! contained and reported like any other tick error.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::context::{SimulationContext, TickSummary};
use crate::error::TickError;

/// Pause after a failed tick.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Run ticks until `shutdown` turns `true` or its sender is dropped.
pub async fn run_scheduler(ctx: Arc<SimulationContext>, mut shutdown: watch::Receiver<bool>) {
    info!(
        tick_interval_ms = ctx.control().tick_interval_ms(),
        running = ctx.control().is_running(),
        "scheduler starting"
    );

    'run: loop {
        if *shutdown.borrow() {
            break;
        }

        let was_running = ctx.control().is_running();
        let mut failed = false;
        if was_running {
            match run_tick_task(&ctx).await {
                Ok(summary) => debug!(tick = summary.tick, "tick finished"),
                Err(e) => {
                    error!(error = %e, "tick failed, backing off");
                    failed = true;
                }
            }
        }

        // A control change only re-arms the wait: a new interval counts
        // from the end of the last tick, and only a start from the stopped
        // state ends the wait early.
        let rested_from = Instant::now();
        loop {
            let delay = if failed {
                ERROR_BACKOFF
            } else {
                Duration::from_millis(ctx.control().tick_interval_ms())
            };
            let deadline = rested_from.checked_add(delay).unwrap_or(rested_from);
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => break,
                () = ctx.control().changed(), if !failed => {
                    if !was_running && ctx.control().is_running() {
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break 'run;
                    }
                }
            }
        }
    }

    info!(tick = ctx.control().tick(), "scheduler stopped");
}

async fn run_tick_task(ctx: &Arc<SimulationContext>) -> Result<TickSummary, TickError> {
    let ctx = Arc::clone(ctx);
    match tokio::spawn(async move { ctx.tick().await }).await {
        Ok(result) => result,
        Err(e) => Err(TickError::Task {
            reason: e.to_string(),
        }),
    }
}
