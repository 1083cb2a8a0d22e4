//! Error types for the tick loop.
//!
//! Tick errors never end the simulation: the scheduler logs them and backs
//! off before the next iteration.

/// Errors that can occur while executing a single tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The tick counter would overflow.
    #[error("tick counter overflow")]
    TickOverflow,

    /// The spawned tick task panicked or was cancelled.
    #[error("tick task failed: {reason}")]
    Task {
        /// Description of the failure.
        reason: String,
    },
}
