//! Read-only REST endpoints.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/agents` | Every agent, in id order |
//! | `GET` | `/api/agents/{id}` | One agent |
//! | `GET` | `/api/agents/conversations` | The conversation log |

use std::sync::Arc;

use agentworld_types::AgentId;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::error::ObserverError;
use crate::state::AppState;

/// List every agent.
pub async fn list_agents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.ctx.snapshot().await)
}

/// Fetch one agent by numeric id.
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<impl IntoResponse, ObserverError> {
    state
        .ctx
        .agent(AgentId(id))
        .await
        .map(Json)
        .ok_or_else(|| ObserverError::NotFound(format!("Agent with ID {id} not found")))
}

/// The conversation log, oldest first.
pub async fn list_conversations(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.ctx.conversation_log().await)
}
