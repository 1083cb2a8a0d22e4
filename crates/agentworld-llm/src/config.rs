//! Configuration types for generation shards.
//!
//! Shards are listed under `llm.shards` in `agentworld-config.yaml`. Each
//! entry names a backend kind and how to reach it; the scripted kind needs
//! no network and is used for offline demos and tests.

use serde::Deserialize;

/// Configuration for a single generation shard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShardConfig {
    /// The backend type (openai, ollama, deepseek, anthropic, scripted).
    pub backend: BackendType,
    /// Base API URL (e.g. `http://localhost:11434/v1`).
    #[serde(default)]
    pub api_url: String,
    /// API key for authentication; empty for local endpoints.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier (e.g. `llama3.2:1b`).
    #[serde(default)]
    pub model: String,
    /// Canned reply for the scripted backend.
    #[serde(default)]
    pub reply: Option<String>,
    /// Make the scripted backend fail every call.
    #[serde(default)]
    pub fail: bool,
    /// Artificial latency of the scripted backend in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,
}

impl ShardConfig {
    /// A scripted shard answering every call with `reply`.
    pub fn scripted(reply: &str) -> Self {
        Self {
            backend: BackendType::Scripted,
            api_url: String::new(),
            api_key: String::new(),
            model: "scripted".to_owned(),
            reply: Some(reply.to_owned()),
            fail: false,
            latency_ms: 0,
        }
    }
}

/// Supported backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    #[serde(alias = "ollama", alias = "deepseek")]
    OpenAi,
    /// Anthropic Messages API (different request format).
    #[serde(alias = "claude")]
    Anthropic,
    /// In-process canned responder.
    Scripted,
}
