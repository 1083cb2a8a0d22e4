//! Tick engine for the Agent World simulation.
//!
//! This crate wires the pure agent logic of `agentworld-agents` to the
//! generation backends of `agentworld-llm`:
//!
//! - [`config`] -- YAML configuration ([`SimulationConfig`])
//! - [`cache`] -- Soft-bounded generation caches
//! - [`fingerprint`] -- Cache keys for thoughts and dialogues
//! - [`limiter`] -- Shared ceiling on outbound calls
//! - [`thinking`] -- Thinking dispatcher
//! - [`conversation`] -- Conversation dispatcher and log
//! - [`operator`] -- Run flag, tick interval, tick counter
//! - [`context`] -- Process-wide [`SimulationContext`] and the tick phases
//! - [`scheduler`] -- The never-failing tick loop
//! - [`error`] -- [`TickError`]

pub mod cache;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod fingerprint;
pub mod limiter;
pub mod operator;
pub mod scheduler;
pub mod thinking;

pub use cache::GenerationCache;
pub use config::{
    ConfigError, ConversationConfig, LlmConfig, LoggingConfig, ObserverConfig, SimulationConfig,
    ThinkingConfig,
};
pub use context::{SimulationContext, SimulationState, TickSummary};
pub use conversation::{ConversationDispatcher, ConversationLog, DialogueRequest, DialogueResult};
pub use error::TickError;
pub use limiter::CallLimiter;
pub use operator::ControlState;
pub use scheduler::run_scheduler;
pub use thinking::{ResolutionSource, ThinkRequest, ThinkingDispatcher, ThoughtResult};
