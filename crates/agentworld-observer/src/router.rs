//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{control, handlers, ws};

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /ws` -- `WebSocket` event stream and command channel
/// - `GET /api/agents` -- list agents
/// - `GET /api/agents/{id}` -- single agent
/// - `GET /api/agents/conversations` -- conversation log
/// - `POST /api/agents/reset` -- new population, stops the simulation
/// - `POST /api/agents/start` / `POST /api/agents/stop` -- run control
/// - `POST /api/agents/speed` -- tick interval
/// - `GET /api/status` -- run state and counters
///
/// CORS allows any origin so the browser client can be served from
/// anywhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_events))
        // Snapshots
        .route("/api/agents", get(handlers::list_agents))
        .route("/api/agents/conversations", get(handlers::list_conversations))
        .route("/api/agents/{id}", get(handlers::get_agent))
        // Control
        .route("/api/agents/reset", post(control::reset))
        .route("/api/agents/start", post(control::start))
        .route("/api/agents/stop", post(control::stop))
        .route("/api/agents/speed", post(control::set_speed))
        .route("/api/status", get(control::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
