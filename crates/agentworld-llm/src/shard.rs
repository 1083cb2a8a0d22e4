//! Deterministic routing of agents to backend shards.
//!
//! Agents are spread across shards by `id mod shard_count`, so the same
//! agent always lands on the same endpoint. An empty pool is valid: every
//! lookup misses and callers fall back.

use agentworld_types::AgentId;
use tracing::info;

use crate::config::ShardConfig;
use crate::llm::{LlmBackend, create_backend};

/// One backend endpoint.
#[derive(Debug, Clone)]
pub struct Shard {
    /// Position in the pool.
    pub index: usize,
    /// The backend serving this shard.
    pub backend: LlmBackend,
}

/// The configured set of shards.
#[derive(Debug, Clone, Default)]
pub struct ShardPool {
    shards: Vec<Shard>,
}

impl ShardPool {
    /// A pool with no shards; every call falls back.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build one shard per config entry, in order.
    pub fn from_configs(configs: &[ShardConfig]) -> Self {
        let shards = configs
            .iter()
            .enumerate()
            .map(|(index, config)| {
                let backend = create_backend(config);
                info!(
                    shard = index,
                    backend = backend.name(),
                    url = %config.api_url,
                    model = %config.model,
                    "generation shard configured"
                );
                Shard { index, backend }
            })
            .collect();
        Self { shards }
    }

    /// A pool over already-built backends.
    pub fn from_backends(backends: Vec<LlmBackend>) -> Self {
        Self {
            shards: backends
                .into_iter()
                .enumerate()
                .map(|(index, backend)| Shard { index, backend })
                .collect(),
        }
    }

    /// The shard that serves `agent`, or `None` for an empty pool.
    pub fn route(&self, agent: AgentId) -> Option<&Shard> {
        shard_index(agent, self.shards.len()).and_then(|i| self.shards.get(i))
    }

    /// Number of shards.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Whether the pool has no shards.
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

/// `id mod count`, or `None` when `count` is zero.
pub fn shard_index(agent: AgentId, count: usize) -> Option<usize> {
    usize::try_from(agent.get())
        .ok()
        .and_then(|id| id.checked_rem(count))
}
