//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]

use std::sync::Arc;

use agentworld_core::{SimulationConfig, SimulationContext};
use agentworld_llm::ShardPool;
use agentworld_observer::router::build_router;
use agentworld_observer::state::AppState;
use agentworld_observer::ws::handle_command;
use agentworld_types::SimulationEvent;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

async fn make_test_state(agents: usize) -> Arc<AppState> {
    let mut config = SimulationConfig::default();
    config.world.seed = Some(11);
    config.llm.enabled = false;
    let ctx = Arc::new(SimulationContext::new(&config, ShardPool::empty()).unwrap());
    ctx.reset(agents).await.unwrap();
    Arc::new(AppState::new(ctx, 5))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: &Arc<AppState>, path: &str) -> (StatusCode, Value) {
    let response = build_router(Arc::clone(state))
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post(state: &Arc<AppState>, path: &str) -> (StatusCode, Value) {
    let response = build_router(Arc::clone(state))
        .oneshot(Request::post(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

#[tokio::test]
async fn list_agents_returns_every_agent_in_id_order() {
    let state = make_test_state(3).await;
    let (status, json) = get(&state, "/api/agents").await;

    assert_eq!(status, StatusCode::OK);
    let agents = json.as_array().unwrap();
    assert_eq!(agents.len(), 3);
    let ids: Vec<u64> = agents.iter().map(|a| a["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert!(agents[0]["name"].is_string());
    assert!(agents[0]["memory"].is_array());
}

#[tokio::test]
async fn get_agent_by_id() {
    let state = make_test_state(2).await;

    let (status, json) = get(&state, "/api/agents/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 1);

    let (status, json) = get(&state, "/api/agents/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn conversations_start_empty() {
    let state = make_test_state(2).await;
    let (status, json) = get(&state, "/api/agents/conversations").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn start_and_stop_toggle_running() {
    let state = make_test_state(2).await;
    assert!(!state.ctx.control().is_running());

    let (status, json) = post(&state, "/api/agents/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"status": "started", "running": true}));
    assert!(state.ctx.control().is_running());

    let (status_code, status_json) = get(&state, "/api/status").await;
    assert_eq!(status_code, StatusCode::OK);
    assert_eq!(status_json["running"], true);
    assert_eq!(status_json["agents"], 2);

    let (_, json) = post(&state, "/api/agents/stop").await;
    assert_eq!(json, serde_json::json!({"status": "stopped", "running": false}));
    assert!(!state.ctx.control().is_running());
}

#[tokio::test]
async fn reset_replaces_population_and_stops() {
    let state = make_test_state(2).await;
    state.ctx.start();

    let (status, json) = post(&state, "/api/agents/reset?num_agents=7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!({"status": "reset", "num_agents": 7, "running": false})
    );
    assert_eq!(state.ctx.snapshot().await.len(), 7);
    assert!(!state.ctx.control().is_running());

    // Without a count the configured default applies.
    let (_, json) = post(&state, "/api/agents/reset").await;
    assert_eq!(json["num_agents"], 5);
}

#[tokio::test]
async fn reset_rejects_out_of_range_counts() {
    let state = make_test_state(2).await;

    let (status, _) = post(&state, "/api/agents/reset?num_agents=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = post(&state, "/api/agents/reset?num_agents=101").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
    assert_eq!(state.ctx.snapshot().await.len(), 2);
}

#[tokio::test]
async fn reset_stops_before_the_new_population_is_visible() {
    let state = make_test_state(2).await;
    state.ctx.start();
    let mut events = state.subscribe();

    let (status, _) = post(&state, "/api/agents/reset?num_agents=6").await;
    assert_eq!(status, StatusCode::OK);

    // The fresh population is published by the reset itself, by which
    // point the simulation must already be stopped.
    match events.recv().await.unwrap() {
        SimulationEvent::AgentUpdate(agents) => assert_eq!(agents.len(), 6),
        other => panic!("unexpected event {}", other.kind()),
    }
    assert!(!state.ctx.control().is_running());
    assert_eq!(state.ctx.control().tick(), 0);
}

#[tokio::test]
async fn rejected_reset_leaves_run_state_alone() {
    let state = make_test_state(2).await;
    state.ctx.start();

    let (status, _) = post(&state, "/api/agents/reset?num_agents=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.ctx.control().is_running());
}

#[tokio::test]
async fn speed_is_validated() {
    let state = make_test_state(2).await;

    let (status, json) = post(&state, "/api/agents/speed?speed=250").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!({"status": "speed_updated", "speed": 250, "running": false})
    );
    assert_eq!(state.ctx.control().tick_interval_ms(), 250);

    let (status, _) = post(&state, "/api/agents/speed?speed=50").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post(&state, "/api/agents/speed?speed=6000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.ctx.control().tick_interval_ms(), 250);
}

#[tokio::test]
async fn websocket_commands_drive_the_simulation() {
    let state = make_test_state(2).await;

    let reply = handle_command(&state, r#"{"command":"start_simulation"}"#).await;
    assert_eq!(reply, serde_json::json!({"status": "simulation_started"}));
    assert!(state.ctx.control().is_running());

    let reply = handle_command(&state, r#"{"command":"update_speed","speed":400}"#).await;
    assert_eq!(reply, serde_json::json!({"status": "speed_updated"}));
    assert_eq!(state.ctx.control().tick_interval_ms(), 400);

    let reply = handle_command(&state, r#"{"command":"reset_simulation","num_agents":4}"#).await;
    assert_eq!(reply, serde_json::json!({"status": "simulation_reset"}));
    assert_eq!(state.ctx.snapshot().await.len(), 4);

    let reply = handle_command(&state, r#"{"command":"stop_simulation"}"#).await;
    assert_eq!(reply, serde_json::json!({"status": "simulation_stopped"}));
    assert!(!state.ctx.control().is_running());
}

#[tokio::test]
async fn malformed_websocket_commands_never_reach_the_core() {
    let state = make_test_state(3).await;

    for text in [
        "not json",
        r#"{"command":"fly"}"#,
        r#"{"command":"update_speed","speed":10}"#,
        r#"{"command":"reset_simulation","num_agents":500}"#,
    ] {
        let reply = handle_command(&state, text).await;
        assert_eq!(reply["status"], "error", "{text}");
        assert!(reply["message"].is_string());
    }

    assert_eq!(state.ctx.snapshot().await.len(), 3);
    assert_eq!(
        state.ctx.control().tick_interval_ms(),
        SimulationConfig::default().world.tick_interval_ms
    );
}
