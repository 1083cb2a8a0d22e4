//! Core data structs shared between the engine and its observers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Goal, Personality};
use crate::ids::AgentId;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Integer pixel coordinates in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Horizontal coordinate, growing east.
    pub x: i32,
    /// Vertical coordinate, growing south.
    pub y: i32,
}

impl Position {
    /// Create a position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(other.x) - f64::from(self.x);
        let dy = f64::from(other.y) - f64::from(self.y);
        dx.hypot(dy)
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Point-in-time view of one agent, as pushed to observers.
///
/// Field names are part of the wire contract with the browser client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSnapshot {
    /// Agent identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Current x coordinate.
    pub x: i32,
    /// Current y coordinate.
    pub y: i32,
    /// Target x coordinate of the current move.
    pub target_x: i32,
    /// Target y coordinate of the current move.
    pub target_y: i32,
    /// Color tag used by the renderer.
    pub color: String,
    /// Recent memories, oldest first.
    pub memory: Vec<String>,
    /// Personality phrase.
    pub personality: Personality,
    /// Goal phrase.
    pub goal: Goal,
    /// The most recently adopted thought (empty before the first one).
    pub last_thought: String,
    /// Movement progress in `[0, 1]`; 1.0 means idle.
    pub move_progress: f64,
}

/// A neighbor as seen by a thinking agent.
///
/// Distances are bucketed so nearby scenes that differ by a pixel or two
/// share a cache fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearbyAgent {
    /// Neighbor's display name.
    pub name: String,
    /// Distance rounded down to the configured bucket width.
    pub distance: u32,
    /// Neighbor's personality.
    pub personality: Personality,
}

/// JSON-serializable status of the simulation for the control API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationStatus {
    /// Whether ticks currently perform work.
    pub running: bool,
    /// Number of ticks that have performed work since startup.
    pub tick: u64,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Number of agents in the world.
    pub agents: u32,
    /// Number of entries in the conversation log.
    pub conversations: u32,
    /// ISO 8601 timestamp of process start.
    pub started_at: String,
}
