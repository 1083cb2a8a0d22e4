//! Server binary for the Agent World simulation.
//!
//! Wires the tick engine to its generation backends and the observer
//! API, then runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`AGENTWORLD_CONFIG`, else `agentworld-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the generation shard pool
//! 4. Build the simulation context and spawn the initial population
//! 5. Spawn the observer API server
//! 6. Spawn the tick scheduler
//! 7. Wait for `Ctrl-C`, then signal shutdown through a `watch` channel

use std::path::PathBuf;
use std::sync::Arc;

use agentworld_core::{LoggingConfig, SimulationConfig, SimulationContext, run_scheduler};
use agentworld_llm::ShardPool;
use agentworld_observer::{AppState, ServerConfig, spawn_observer};
use anyhow::Context as _;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Config file read when `AGENTWORLD_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "agentworld-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the initial population
/// cannot be spawned, or the observer address is malformed.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, config_path) = load_config()?;

    init_logging(&config.logging);
    info!("agentworld-server starting");
    info!(
        path = %config_path.display(),
        width = config.world.width,
        height = config.world.height,
        initial_agents = config.world.initial_agents,
        tick_interval_ms = config.world.tick_interval_ms,
        llm_enabled = config.llm.enabled,
        "Configuration loaded"
    );

    let shards = ShardPool::from_configs(&config.llm.shards);
    info!(
        shards = shards.len(),
        max_concurrent_calls = config.llm.max_concurrent_calls,
        "Generation shards configured"
    );

    let ctx = Arc::new(
        SimulationContext::new(&config, shards).context("failed to build simulation context")?,
    );
    let spawned = ctx
        .reset(config.world.initial_agents)
        .await
        .context("failed to spawn initial agents")?;
    info!(agents = spawned, "Initial population spawned");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let state = Arc::new(AppState::new(Arc::clone(&ctx), config.world.initial_agents));
    let observer = spawn_observer(ServerConfig::from(&config.observer), state, shutdown_rx.clone())
        .context("failed to start observer")?;

    let scheduler = tokio::spawn(run_scheduler(Arc::clone(&ctx), shutdown_rx));
    info!("Simulation ready; waiting for a start command");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutdown requested");

    if shutdown_tx.send(true).is_err() {
        warn!("Shutdown receivers already gone");
    }
    if let Err(e) = scheduler.await {
        warn!(error = %e, "Scheduler task ended abnormally");
    }
    if let Err(e) = observer.await {
        warn!(error = %e, "Observer task ended abnormally");
    }

    info!(ticks = ctx.control().tick(), "agentworld-server stopped");
    Ok(())
}

/// Load configuration from the configured path, or defaults when the
/// file does not exist. Environment overrides apply either way.
fn load_config() -> anyhow::Result<(SimulationConfig, PathBuf)> {
    let path = std::env::var_os("AGENTWORLD_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        let config = SimulationConfig::from_file(&path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        return Ok((config, path));
    }

    let mut config = SimulationConfig::default();
    config
        .apply_env_overrides()
        .context("invalid environment override")?;
    config.validate().context("invalid default configuration")?;
    Ok((config, path))
}

/// Install the global tracing subscriber. `RUST_LOG` takes precedence
/// over the configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
