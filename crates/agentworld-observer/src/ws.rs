//! `WebSocket` handler for event streaming and client commands.
//!
//! Clients connect to `GET /ws`, receive the current agent and
//! conversation state, then every [`SimulationEvent`] the tick engine
//! publishes. The same socket accepts control commands:
//!
//! ```json
//! {"command": "reset_simulation", "num_agents": 8}
//! ```
//!
//! Each command is answered with a `{"status": ...}` frame. The bare
//! text `ping` is answered with `pong`.
//!
//! If a client falls behind, lagged events are skipped and the client
//! resumes from the most recent one.

use std::sync::Arc;

use agentworld_types::SimulationEvent;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::control::{self, ResetParams, SpeedParams};
use crate::error::ObserverError;
use crate::state::AppState;

/// A control command sent by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Let ticks perform work.
    StartSimulation,
    /// Make ticks idle.
    StopSimulation,
    /// Replace the population.
    ResetSimulation {
        /// Agents to spawn; the configured default when absent.
        #[serde(default)]
        num_agents: Option<usize>,
    },
    /// Change the tick interval.
    UpdateSpeed {
        /// Tick interval in milliseconds.
        speed: u64,
    },
}

/// Upgrade an HTTP request to a `WebSocket` connection.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Parse and apply one client command. Returns the reply frame body.
///
/// Malformed or out-of-range commands produce an error reply and never
/// reach the simulation.
pub async fn handle_command(state: &AppState, text: &str) -> serde_json::Value {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(c) => c,
        Err(e) => return error_reply(&format!("invalid command: {e}")),
    };

    let outcome: Result<&'static str, ObserverError> = match command {
        ClientCommand::StartSimulation => {
            state.ctx.start();
            Ok("simulation_started")
        }
        ClientCommand::StopSimulation => {
            state.ctx.stop();
            Ok("simulation_stopped")
        }
        ClientCommand::ResetSimulation { num_agents } => {
            control::apply_reset(state, ResetParams { num_agents })
                .await
                .map(|_| "simulation_reset")
        }
        ClientCommand::UpdateSpeed { speed } => {
            control::apply_speed(state, SpeedParams { speed }).map(|()| "speed_updated")
        }
    };

    match outcome {
        Ok(status) => {
            info!(?command, "client command applied");
            serde_json::json!({ "status": status })
        }
        Err(e) => error_reply(&e.to_string()),
    }
}

fn error_reply(message: &str) -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "message": message,
    })
}

async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> bool {
    let json = match serde_json::to_string(value) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize WebSocket frame: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

/// Handle the `WebSocket` lifecycle: push the current state, then
/// interleave published events with client commands.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    // Subscribe before reading so nothing published in between is lost.
    let mut rx = state.subscribe();

    let initial = [
        SimulationEvent::AgentUpdate(state.ctx.snapshot().await),
        SimulationEvent::ConversationUpdate(state.ctx.conversation_log().await),
    ];
    for event in &initial {
        if !send_json(&mut socket, event).await {
            debug!("WebSocket client disconnected (initial push failed)");
            return;
        }
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !send_json(&mut socket, &event).await {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Text(text))) => {
                        let sent = if text.as_str() == "ping" {
                            socket.send(Message::Text("pong".into())).await.is_ok()
                        } else {
                            let reply = handle_command(&state, text.as_str()).await;
                            send_json(&mut socket, &reply).await
                        };
                        if !sent {
                            debug!("WebSocket client disconnected (reply failed)");
                            return;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_tagged_json() {
        let reset: ClientCommand =
            serde_json::from_str(r#"{"command":"reset_simulation","num_agents":4}"#).unwrap();
        assert_eq!(reset, ClientCommand::ResetSimulation { num_agents: Some(4) });

        let bare: ClientCommand = serde_json::from_str(r#"{"command":"reset_simulation"}"#).unwrap();
        assert_eq!(bare, ClientCommand::ResetSimulation { num_agents: None });

        let speed: ClientCommand =
            serde_json::from_str(r#"{"command":"update_speed","speed":250}"#).unwrap();
        assert_eq!(speed, ClientCommand::UpdateSpeed { speed: 250 });
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(serde_json::from_str::<ClientCommand>(r#"{"command":"launch"}"#).is_err());
        assert!(serde_json::from_str::<ClientCommand>(r#"{"command":"update_speed"}"#).is_err());
    }
}
