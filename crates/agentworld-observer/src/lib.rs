//! Observer API server for the Agent World simulation.
//!
//! This crate is the transport in front of the tick engine:
//!
//! - **`WebSocket` endpoint** (`/ws`) pushing agent and conversation
//!   updates as they are published, and accepting control commands
//! - **REST endpoints** under `/api` for snapshots and control
//!   (start, stop, reset, speed, status)
//!
//! # Architecture
//!
//! Handlers hold an [`Arc`](std::sync::Arc) to the core
//! [`SimulationContext`](agentworld_core::SimulationContext). Reads take
//! the context's read lock briefly; control calls flip atomics. User input
//! is validated here with `validator`, so the core only ever sees
//! in-range values.

pub mod control;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::spawn_observer;
pub use state::AppState;
