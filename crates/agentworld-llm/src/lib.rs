//! Generation backends for the Agent World simulation.
//!
//! The simulation treats text generation as a capability: render a prompt,
//! send it to the shard bound to an agent, and get text back or a typed
//! [`GenerationError`]. When that fails, [`select_fallback`] supplies a
//! deterministic template instead.
//!
//! # Modules
//!
//! - [`config`] -- Shard configuration ([`ShardConfig`], [`BackendType`])
//! - [`error`] -- Error type for generation calls ([`GenerationError`])
//! - [`fallback`] -- Deterministic template fallbacks
//! - [`llm`] -- Backend implementations with enum dispatch ([`LlmBackend`])
//! - [`prompt`] -- `minijinja` prompt rendering ([`PromptEngine`])
//! - [`shard`] -- `id mod N` routing ([`ShardPool`])

pub mod config;
pub mod error;
pub mod fallback;
pub mod llm;
pub mod prompt;
pub mod shard;

pub use config::{BackendType, ShardConfig};
pub use error::GenerationError;
pub use fallback::{FallbackRequest, select_fallback};
pub use llm::{GenerationRequest, LlmBackend, ScriptedBackend, ScriptedReply, create_backend};
pub use prompt::{DialoguePrompt, Participant, PromptEngine, RenderedPrompt, ThoughtPrompt};
pub use shard::{Shard, ShardPool, shard_index};
