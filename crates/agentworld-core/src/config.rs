//! Configuration loading and typed config structures for Agent World.
//!
//! The canonical configuration lives in `agentworld-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads, overrides from the
//! environment, and validates the file. Every field has a default, so an
//! empty file is a valid configuration.

use std::path::{Path, PathBuf};

use agentworld_agents::{AgentConfig, WorldConfig, WorldError};
use agentworld_llm::{GenerationError, ShardConfig};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The world or agent policy is invalid.
    #[error("invalid world config: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// A prompt template could not be loaded.
    #[error("invalid prompt templates: {source}")]
    Prompt {
        /// The underlying template error.
        #[from]
        source: GenerationError,
    },

    /// Any other out-of-range value.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `agentworld-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World bounds, population, tick interval, palette.
    #[serde(default)]
    pub world: WorldConfig,

    /// Per-agent movement and interaction policy.
    #[serde(default)]
    pub agents: AgentConfig,

    /// Thinking dispatcher policy.
    #[serde(default)]
    pub thinking: ThinkingConfig,

    /// Conversation dispatcher policy.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Generation backend settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Observer server binding.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override deployment values:
    /// - `OBSERVER_PORT` overrides `observer.port`
    /// - `LLM_API_KEY` fills `api_key` on shards that leave it empty
    /// - `LLM_BASE_URL` fills `api_url` on shards that leave it empty
    ///
    /// The result is validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, and a
    /// validation error if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, without environment
    /// overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `OBSERVER_PORT` is not a port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `OBSERVER_PORT` is not a port.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("OBSERVER_PORT") {
            self.observer.port = port.trim().parse().map_err(|e| ConfigError::Invalid {
                reason: format!("OBSERVER_PORT={port:?}: {e}"),
            })?;
        }
        if let Some(key) = lookup("LLM_API_KEY") {
            for shard in self.llm.shards.iter_mut().filter(|s| s.api_key.is_empty()) {
                shard.api_key.clone_from(&key);
            }
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            for shard in self.llm.shards.iter_mut().filter(|s| s.api_url.is_empty()) {
                shard.api_url.clone_from(&url);
            }
        }
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        self.agents.validate()?;
        let checks = [
            (self.world.tick_interval_ms == 0, "world.tick_interval_ms must be at least 1"),
            (self.llm.max_concurrent_calls == 0, "llm.max_concurrent_calls must be at least 1"),
            (self.thinking.position_bucket <= 0, "thinking.position_bucket must be positive"),
            (self.thinking.time_bucket_secs == 0, "thinking.time_bucket_secs must be at least 1"),
            (
                self.conversation.time_bucket_secs == 0,
                "conversation.time_bucket_secs must be at least 1",
            ),
            (self.conversation.max_log == 0, "conversation.max_log must be at least 1"),
        ];
        if let Some((_, reason)) = checks.into_iter().find(|(failed, _)| *failed) {
            return Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            });
        }
        Ok(())
    }
}

/// Thinking dispatcher policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThinkingConfig {
    /// Neighbors closer than this are visible to a thinking agent.
    #[serde(default = "default_perception_radius")]
    pub perception_radius: f64,

    /// Maximum neighbors included in a prompt.
    #[serde(default = "default_max_neighbors")]
    pub max_neighbors: usize,

    /// Grid cell size for the position part of the fingerprint.
    #[serde(default = "default_position_bucket")]
    pub position_bucket: i32,

    /// Rounding step for neighbor distances.
    #[serde(default = "default_distance_bucket")]
    pub distance_bucket: u32,

    /// Width of the time window in which cached thoughts are reused.
    #[serde(default = "default_thought_time_bucket_secs")]
    pub time_bucket_secs: u64,

    /// Soft ceiling on cached thoughts.
    #[serde(default = "default_thought_cache_capacity")]
    pub cache_capacity: usize,

    /// Recent memories included in a prompt.
    #[serde(default = "default_memory_in_prompt")]
    pub memory_in_prompt: usize,
}

impl Default for ThinkingConfig {
    fn default() -> Self {
        Self {
            perception_radius: default_perception_radius(),
            max_neighbors: default_max_neighbors(),
            position_bucket: default_position_bucket(),
            distance_bucket: default_distance_bucket(),
            time_bucket_secs: default_thought_time_bucket_secs(),
            cache_capacity: default_thought_cache_capacity(),
            memory_in_prompt: default_memory_in_prompt(),
        }
    }
}

/// Conversation dispatcher policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationConfig {
    /// Entries kept in the conversation log.
    #[serde(default = "default_max_log")]
    pub max_log: usize,

    /// Width of the time window in which cached dialogues are reused.
    #[serde(default = "default_dialogue_time_bucket_secs")]
    pub time_bucket_secs: u64,

    /// Soft ceiling on cached dialogues.
    #[serde(default = "default_dialogue_cache_capacity")]
    pub cache_capacity: usize,

    /// Pairs drained per tick (0 = all).
    #[serde(default)]
    pub max_pairs_per_tick: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_log: default_max_log(),
            time_bucket_secs: default_dialogue_time_bucket_secs(),
            cache_capacity: default_dialogue_cache_capacity(),
            max_pairs_per_tick: 0,
        }
    }
}

/// Generation backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LlmConfig {
    /// When false every request falls back without calling a backend.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Ceiling on simultaneous backend calls across both dispatchers.
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,

    /// Per-call deadline for thoughts in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub thought_timeout_ms: u64,

    /// Per-call deadline for dialogues in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub dialogue_timeout_ms: u64,

    /// Response length cap for thoughts.
    #[serde(default = "default_thought_max_tokens")]
    pub thought_max_tokens: u32,

    /// Response length cap for dialogues.
    #[serde(default = "default_dialogue_max_tokens")]
    pub dialogue_max_tokens: u32,

    /// Directory holding `thought.j2` / `dialogue.j2` overrides.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,

    /// Backend shards; agents are routed by `id mod len`.
    #[serde(default)]
    pub shards: Vec<ShardConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent_calls: default_max_concurrent_calls(),
            thought_timeout_ms: default_call_timeout_ms(),
            dialogue_timeout_ms: default_call_timeout_ms(),
            thought_max_tokens: default_thought_max_tokens(),
            dialogue_max_tokens: default_dialogue_max_tokens(),
            templates_dir: None,
            shards: Vec::new(),
        }
    }
}

/// Observer server binding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Interface to bind.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

const fn default_perception_radius() -> f64 {
    100.0
}

const fn default_max_neighbors() -> usize {
    2
}

const fn default_position_bucket() -> i32 {
    50
}

const fn default_distance_bucket() -> u32 {
    10
}

const fn default_thought_time_bucket_secs() -> u64 {
    30
}

const fn default_thought_cache_capacity() -> usize {
    512
}

const fn default_memory_in_prompt() -> usize {
    5
}

const fn default_max_log() -> usize {
    10
}

const fn default_dialogue_time_bucket_secs() -> u64 {
    3600
}

const fn default_dialogue_cache_capacity() -> usize {
    256
}

const fn default_max_concurrent_calls() -> usize {
    2
}

const fn default_call_timeout_ms() -> u64 {
    3000
}

const fn default_thought_max_tokens() -> u32 {
    40
}

const fn default_dialogue_max_tokens() -> u32 {
    80
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
