//! Events published after each tick for fan-out to observers.
//!
//! The serialized shape is `{"type": "...", "data": ...}`, which is what
//! the browser client listens for.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::AgentSnapshot;

/// A structured event pushed to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SimulationEvent {
    /// Full agent snapshot, published after every tick that ran work.
    AgentUpdate(Vec<AgentSnapshot>),
    /// Rendered conversation log, published when the log changed.
    ConversationUpdate(Vec<String>),
}

impl SimulationEvent {
    /// Short name for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AgentUpdate(_) => "agent_update",
            Self::ConversationUpdate(_) => "conversation_update",
        }
    }
}
