//! Agent identifier.
//!
//! Agents are numbered densely from zero at every reset, so the id doubles
//! as the insertion order and as the shard routing key.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Stable identifier of an agent for the lifetime of one world.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct AgentId(pub u32);

impl AgentId {
    /// Return the raw integer value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AgentId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}
