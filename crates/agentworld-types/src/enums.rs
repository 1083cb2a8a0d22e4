//! Enumeration types drawn from fixed vocabularies.
//!
//! Personality and goal are assigned once at agent creation and never
//! change. Both serialize as their human-readable phrase, which is what
//! the browser client displays and what prompts embed.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Temperament of an agent, used in prompts and fallback templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Personality {
    /// Wanders toward the unknown.
    #[serde(rename = "Curious and explorative")]
    Curious,
    /// Weighs options before acting.
    #[serde(rename = "Analytical and cautious")]
    Analytical,
    /// Seeks company.
    #[serde(rename = "Social and friendly")]
    Social,
    /// Prefers to go it alone.
    #[serde(rename = "Independent and resourceful")]
    Independent,
    /// Thinks in pictures and stories.
    #[serde(rename = "Creative and imaginative")]
    Creative,
}

impl Personality {
    /// Every personality, in vocabulary order.
    pub const ALL: [Self; 5] = [
        Self::Curious,
        Self::Analytical,
        Self::Social,
        Self::Independent,
        Self::Creative,
    ];

    /// The display phrase.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Curious => "Curious and explorative",
            Self::Analytical => "Analytical and cautious",
            Self::Social => "Social and friendly",
            Self::Independent => "Independent and resourceful",
            Self::Creative => "Creative and imaginative",
        }
    }
}

impl core::fmt::Display for Personality {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Long-running ambition of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Goal {
    /// Cover as much ground as possible.
    #[serde(rename = "Explore the entire world")]
    Explore,
    /// Meet everyone at least once.
    #[serde(rename = "Interact with every other agent")]
    MeetEveryone,
    /// Learn about the surroundings.
    #[serde(rename = "Collect knowledge about the environment")]
    CollectKnowledge,
    /// Find a good place to stay.
    #[serde(rename = "Find an optimal location to settle")]
    Settle,
    /// Team up with others.
    #[serde(rename = "Create alliances with other agents")]
    FormAlliances,
}

impl Goal {
    /// Every goal, in vocabulary order.
    pub const ALL: [Self; 5] = [
        Self::Explore,
        Self::MeetEveryone,
        Self::CollectKnowledge,
        Self::Settle,
        Self::FormAlliances,
    ];

    /// The display phrase.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explore => "Explore the entire world",
            Self::MeetEveryone => "Interact with every other agent",
            Self::CollectKnowledge => "Collect knowledge about the environment",
            Self::Settle => "Find an optimal location to settle",
            Self::FormAlliances => "Create alliances with other agents",
        }
    }
}

impl core::fmt::Display for Goal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Movement intent chosen from a thought. Screen coordinates: north is -y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Direction {
    /// Toward smaller y.
    North,
    /// Toward larger y.
    South,
    /// Toward larger x.
    East,
    /// Toward smaller x.
    West,
    /// Small jitter in place.
    Stay,
}

impl Direction {
    /// Every direction, in keyword priority order.
    pub const ALL: [Self; 5] = [Self::North, Self::South, Self::East, Self::West, Self::Stay];

    /// Lowercase keyword.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
            Self::Stay => "stay",
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
