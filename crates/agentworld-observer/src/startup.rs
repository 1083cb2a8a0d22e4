//! Observer server startup helper for embedding in the server binary.
//!
//! [`spawn_observer`] launches the HTTP + `WebSocket` server on a
//! background Tokio task so it runs alongside the tick scheduler.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError, start_server};
use crate::state::AppState;

/// Spawn the Observer HTTP server on a background Tokio task.
///
/// The address is checked before spawning so obvious misconfiguration
/// surfaces to the caller. Bind failures inside the task are logged.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if `config` does not name a valid
/// socket address.
pub fn spawn_observer(
    config: ServerConfig,
    state: Arc<AppState>,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<()>, ServerError> {
    let addr = config.addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = start_server(&config, state, shutdown).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");

    Ok(handle)
}
