//! Shared application state for the Observer API server.

use std::sync::Arc;

use agentworld_core::SimulationContext;
use agentworld_types::SimulationEvent;
use tokio::sync::broadcast;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The simulation this server fronts.
    pub ctx: Arc<SimulationContext>,
    /// Population used by a reset that names no count.
    pub default_agents: usize,
}

impl AppState {
    /// Wrap a context; resets without a count spawn `default_agents`.
    pub const fn new(ctx: Arc<SimulationContext>, default_agents: usize) -> Self {
        Self {
            ctx,
            default_agents,
        }
    }

    /// Subscribe to events published by the tick engine.
    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.ctx.subscribe()
    }
}
