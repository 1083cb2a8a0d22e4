//! Error types for the agentworld-agents crate.
//!
//! World construction and reset validate their inputs up front and return
//! typed errors rather than panicking. Per-tick agent logic is infallible.

use agentworld_types::AgentId;

/// Errors that can occur while building or mutating the world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The activity area is empty or not strictly inside the world bounds.
    #[error("invalid activity area: {reason}")]
    InvalidArea {
        /// What is wrong with the area.
        reason: String,
    },

    /// A policy value is out of range.
    #[error("invalid agent policy: {reason}")]
    InvalidPolicy {
        /// What is wrong with the policy.
        reason: String,
    },

    /// A reset asked for zero agents.
    #[error("agent count must be at least 1, got {requested}")]
    InvalidAgentCount {
        /// The rejected count.
        requested: usize,
    },

    /// The color palette is empty.
    #[error("at least one agent color must be configured")]
    NoColors,

    /// A lookup referenced an agent that is not in the world.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),
}
