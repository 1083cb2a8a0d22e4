//! Shared type definitions for the Agent World simulation.
//!
//! This crate is the single source of truth for the data that crosses
//! crate and process boundaries. Snapshot types flow downstream to
//! `TypeScript` via `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Integer agent identifier
//! - [`enums`] -- Personality, goal, and direction vocabularies
//! - [`structs`] -- Positions, agent snapshots, perception entries
//! - [`events`] -- Events pushed to observers after each tick

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Direction, Goal, Personality};
pub use events::SimulationEvent;
pub use ids::AgentId;
pub use structs::{AgentSnapshot, NearbyAgent, Position, SimulationStatus};
