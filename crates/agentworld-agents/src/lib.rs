//! Agent state, movement, and interaction detection for the Agent World
//! simulation.
//!
//! This crate is the pure logic layer: everything that operates on agent
//! and world state without touching I/O or the generation backend. It sits
//! between `agentworld-types` (the data shapes) and `agentworld-core`
//! (dispatch and scheduling).
//!
//! # Modules
//!
//! - [`agent`] -- Per-agent movement state machine ([`Agent`])
//! - [`config`] -- Tunable policy ([`AgentConfig`], [`WorldConfig`])
//! - [`error`] -- Error types ([`WorldError`])
//! - [`interaction`] -- Proximity scan and exclusive conversation queue
//! - [`memory`] -- Bounded, time-stamped memory ring
//! - [`movement`] -- Easing, direction parsing, target selection
//! - [`world`] -- Agent collection and reset/step orchestration ([`World`])

pub mod agent;
pub mod config;
pub mod error;
pub mod interaction;
pub mod memory;
pub mod movement;
pub mod world;

// Re-export primary types at crate root for convenience.
pub use agent::{Agent, AgentIdentity};
pub use config::{ActivityArea, AgentConfig, WorldConfig};
pub use error::WorldError;
pub use interaction::{ConversationPair, ConversationQueue, detect_interactions};
pub use memory::MemoryRing;
pub use world::{AGENT_NAMES, StepOutcome, World, agent_name};
