//! Control endpoints and the validated parameters they share with the
//! `WebSocket` command channel.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/agents/reset?num_agents=` | New population; stops the simulation |
//! | `POST` | `/api/agents/start` | Let ticks perform work |
//! | `POST` | `/api/agents/stop` | Make ticks idle |
//! | `POST` | `/api/agents/speed?speed=` | Set tick interval (ms) |
//! | `GET` | `/api/status` | Run state and counters |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Arguments of a reset.
#[derive(Debug, Clone, Copy, Default, Deserialize, Validate)]
pub struct ResetParams {
    /// Number of agents to spawn; the configured default when absent.
    #[validate(range(min = 1, max = 100))]
    pub num_agents: Option<usize>,
}

/// Arguments of a speed change.
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct SpeedParams {
    /// Tick interval in milliseconds.
    #[validate(range(min = 100, max = 5000))]
    pub speed: u64,
}

/// Validate `params` and reset the world. Returns the number of agents
/// spawned.
///
/// # Errors
///
/// Returns [`ObserverError::InvalidQuery`] for an out-of-range count.
pub async fn apply_reset(state: &AppState, params: ResetParams) -> Result<usize, ObserverError> {
    params.validate()?;
    let count = params.num_agents.unwrap_or(state.default_agents);
    let spawned = state
        .ctx
        .reset(count)
        .await
        .map_err(|e| ObserverError::InvalidQuery(e.to_string()))?;
    info!(requested = count, spawned, "simulation reset");
    Ok(spawned)
}

/// Validate `params` and change the tick interval.
///
/// # Errors
///
/// Returns [`ObserverError::InvalidQuery`] for an out-of-range interval.
pub fn apply_speed(state: &AppState, params: SpeedParams) -> Result<(), ObserverError> {
    params.validate()?;
    state
        .ctx
        .set_tick_interval_ms(params.speed)
        .map(|_| ())
        .ok_or_else(|| ObserverError::InvalidQuery("speed must be positive".to_owned()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Replace the population and stop the simulation.
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResetParams>,
) -> Result<impl IntoResponse, ObserverError> {
    params.validate()?;
    // Stop first so no scheduled tick runs on the fresh population.
    state.ctx.stop();
    let spawned = apply_reset(&state, params).await?;
    Ok(Json(serde_json::json!({
        "status": "reset",
        "num_agents": spawned,
        "running": false,
    })))
}

/// Start the simulation.
pub async fn start(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.ctx.start();
    Json(serde_json::json!({
        "status": "started",
        "running": true,
    }))
}

/// Stop the simulation. In-flight generation calls still complete.
pub async fn stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.ctx.stop();
    Json(serde_json::json!({
        "status": "stopped",
        "running": false,
    }))
}

/// Change the tick interval.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SpeedParams>,
) -> Result<impl IntoResponse, ObserverError> {
    apply_speed(&state, params)?;
    Ok(Json(serde_json::json!({
        "status": "speed_updated",
        "speed": params.speed,
        "running": state.ctx.control().is_running(),
    })))
}

/// Current run state and counters.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.ctx.status().await)
}
