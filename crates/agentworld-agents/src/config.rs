//! Tunable movement and interaction policy for agents.
//!
//! These values mirror the `agents` and `world` sections of
//! `agentworld-config.yaml`. [`AgentConfig`] bundles the per-agent tunables
//! and [`WorldConfig`] the bounds and spawn policy, so callers can override
//! defaults field by field.

use agentworld_types::Position;
use serde::Deserialize;

use crate::error::WorldError;

/// Per-agent movement, thinking, and interaction policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum memories an agent keeps before evicting the oldest (default: 10).
    pub max_memory: usize,

    /// Distance below which two agents can start a conversation (default: 30).
    pub interaction_radius: f64,

    /// Probability per idle tick of becoming eligible to think (default: 0.01).
    pub think_chance: f64,

    /// Idle ticks between thinking opportunities (default: 10).
    pub think_cooldown: u32,

    /// Movement progress added per tick; 0.2 completes a move in 5 ticks.
    pub progress_step: f64,

    /// Progress at which a queued target is pulled early (default: 0.9).
    pub prefetch_threshold: f64,

    /// Smallest step in pixels for a directed move (default: 5).
    pub step_min: i32,

    /// Largest step in pixels for a directed move (default: 15).
    pub step_max: i32,

    /// Maximum per-axis jitter in pixels when staying put (default: 3).
    pub stay_jitter: i32,

    /// Probability per initiator per tick of scanning for neighbors (default: 0.7).
    pub interaction_check_chance: f64,

    /// Probability of a conversation when two eligible agents are close (default: 0.6).
    pub conversation_chance: f64,

    /// Refractory ticks applied to both agents after a pair registers (default: 2).
    pub conversation_cooldown: i32,

    /// Minimum movement progress for an agent to initiate (default: 0.8).
    pub detect_min_progress: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_memory: 10,
            interaction_radius: 30.0,
            think_chance: 0.01,
            think_cooldown: 10,
            progress_step: 0.2,
            prefetch_threshold: 0.9,
            step_min: 5,
            step_max: 15,
            stay_jitter: 3,
            interaction_check_chance: 0.7,
            conversation_chance: 0.6,
            conversation_cooldown: 2,
            detect_min_progress: 0.8,
        }
    }
}

impl AgentConfig {
    /// Check that probabilities are in `[0, 1]` and step bounds are ordered.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidPolicy`] naming the offending field.
    pub fn validate(&self) -> Result<(), WorldError> {
        let probabilities = [
            ("think_chance", self.think_chance),
            ("interaction_check_chance", self.interaction_check_chance),
            ("conversation_chance", self.conversation_chance),
        ];
        for (field, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(WorldError::InvalidPolicy {
                    reason: format!("{field} must be within [0, 1], got {p}"),
                });
            }
        }
        if !(self.progress_step > 0.0 && self.progress_step <= 1.0) {
            return Err(WorldError::InvalidPolicy {
                reason: format!("progress_step must be within (0, 1], got {}", self.progress_step),
            });
        }
        if self.step_min < 0 || self.step_min > self.step_max {
            return Err(WorldError::InvalidPolicy {
                reason: format!(
                    "step bounds must satisfy 0 <= step_min <= step_max, got {}..={}",
                    self.step_min, self.step_max
                ),
            });
        }
        if self.stay_jitter < 0 {
            return Err(WorldError::InvalidPolicy {
                reason: "stay_jitter must not be negative".to_owned(),
            });
        }
        if self.max_memory == 0 {
            return Err(WorldError::InvalidPolicy {
                reason: "max_memory must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// World bounds, population, and spawn policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World width in pixels (default: 500).
    pub width: i32,

    /// World height in pixels (default: 500).
    pub height: i32,

    /// Rectangle agents spawn in and move within.
    pub activity_area: ActivityArea,

    /// Agents spawned at startup (default: 10).
    pub initial_agents: usize,

    /// Upper bound applied to every reset (default: 30).
    pub max_agents: usize,

    /// Milliseconds between ticks at startup (default: 500).
    pub tick_interval_ms: u64,

    /// Seed for the world RNG; `None` draws from OS entropy.
    pub seed: Option<u64>,

    /// Color tags assigned to agents in order, cycling.
    pub colors: Vec<String>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            activity_area: ActivityArea::default(),
            initial_agents: 10,
            max_agents: 30,
            tick_interval_ms: 500,
            seed: None,
            colors: [
                "blue", "red", "green", "orange", "purple", "cyan", "magenta", "yellow", "teal",
                "pink",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

impl WorldConfig {
    /// Check bounds, area, population cap, and palette.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorldError`] found.
    pub fn validate(&self) -> Result<(), WorldError> {
        self.activity_area.validate_within(self.width, self.height)?;
        if self.max_agents == 0 {
            return Err(WorldError::InvalidAgentCount { requested: 0 });
        }
        if self.colors.is_empty() {
            return Err(WorldError::NoColors);
        }
        Ok(())
    }
}

/// Axis-aligned rectangle agents spawn in and move within (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ActivityArea {
    /// Western edge.
    pub min_x: i32,
    /// Northern edge.
    pub min_y: i32,
    /// Eastern edge.
    pub max_x: i32,
    /// Southern edge.
    pub max_y: i32,
}

impl Default for ActivityArea {
    fn default() -> Self {
        Self {
            min_x: 150,
            min_y: 150,
            max_x: 350,
            max_y: 300,
        }
    }
}

impl ActivityArea {
    /// Clamp a position into the area.
    pub fn clamp(self, pos: Position) -> Position {
        Position::new(
            pos.x.clamp(self.min_x, self.max_x),
            pos.y.clamp(self.min_y, self.max_y),
        )
    }

    /// Whether the position lies inside the area (edges included).
    pub const fn contains(self, pos: Position) -> bool {
        pos.x >= self.min_x && pos.x <= self.max_x && pos.y >= self.min_y && pos.y <= self.max_y
    }

    /// Check that the area is non-empty and strictly inside `width` x `height`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidArea`] otherwise.
    pub fn validate_within(self, width: i32, height: i32) -> Result<(), WorldError> {
        let ordered = self.min_x <= self.max_x && self.min_y <= self.max_y;
        let inside = self.min_x > 0 && self.min_y > 0 && self.max_x < width && self.max_y < height;
        if ordered && inside {
            Ok(())
        } else {
            Err(WorldError::InvalidArea {
                reason: format!(
                    "area x {}..={} y {}..={} is not strictly inside {width}x{height}",
                    self.min_x, self.max_x, self.min_y, self.max_y
                ),
            })
        }
    }
}
