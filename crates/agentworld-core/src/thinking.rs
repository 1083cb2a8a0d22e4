//! Thinking dispatcher: turns agents that are due for a thought into
//! queued thoughts.
//!
//! Each tick the world hands over the agents that became eligible. For
//! every one of them the dispatcher:
//!
//! 1. Gathers the nearest neighbors within perception range.
//! 2. Computes a fingerprint and checks the thought cache.
//! 3. On a miss, renders a prompt and calls the agent's shard through the
//!    shared [`CallLimiter`].
//! 4. On any failure, picks a deterministic fallback.
//!
//! Resolution runs without touching the world. Results are committed under
//! the world lock afterwards, and only if the world has not been reset in
//! the meantime.

use std::sync::Arc;
use std::time::Duration;

use agentworld_agents::World;
use agentworld_llm::{
    FallbackRequest, GenerationRequest, PromptEngine, ShardPool, ThoughtPrompt, select_fallback,
};
use agentworld_types::AgentId;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::GenerationCache;
use crate::config::{LlmConfig, ThinkingConfig};
use crate::fingerprint::{thought_fingerprint, time_bucket};
use crate::limiter::CallLimiter;

/// Where a resolved text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Reused from the cache; no backend call.
    Cache,
    /// Freshly generated by a backend.
    Backend,
    /// Template fallback.
    Fallback,
}

/// One agent waiting for a thought.
#[derive(Debug, Clone)]
pub struct ThinkRequest {
    /// The thinking agent.
    pub agent: AgentId,
    /// World epoch the request was built against.
    pub epoch: u64,
    /// Cache key.
    pub fingerprint: u64,
    /// Prompt context.
    pub prompt: ThoughtPrompt,
}

/// A resolved thought, ready to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThoughtResult {
    /// The thinking agent.
    pub agent: AgentId,
    /// World epoch the request was built against.
    pub epoch: u64,
    /// The thought text.
    pub text: String,
    /// How it was produced.
    pub source: ResolutionSource,
}

/// Resolves thinking batches.
#[derive(Debug)]
pub struct ThinkingDispatcher {
    policy: ThinkingConfig,
    enabled: bool,
    timeout: Duration,
    max_tokens: u32,
    prompts: Arc<PromptEngine>,
    shards: Arc<ShardPool>,
    limiter: CallLimiter,
    cache: GenerationCache,
}

impl ThinkingDispatcher {
    /// Build a dispatcher sharing `prompts`, `shards`, and `limiter` with
    /// the conversation dispatcher.
    pub fn new(
        policy: ThinkingConfig,
        llm: &LlmConfig,
        prompts: Arc<PromptEngine>,
        shards: Arc<ShardPool>,
        limiter: CallLimiter,
    ) -> Self {
        let cache = GenerationCache::new("thought", policy.cache_capacity);
        Self {
            policy,
            enabled: llm.enabled,
            timeout: Duration::from_millis(llm.thought_timeout_ms),
            max_tokens: llm.thought_max_tokens,
            prompts,
            shards,
            limiter,
            cache,
        }
    }

    /// The thought cache.
    pub const fn cache(&self) -> &GenerationCache {
        &self.cache
    }

    /// Build requests for `agents`, skipping ids that no longer exist.
    pub fn build_requests(&self, world: &World, agents: &[AgentId], now: DateTime<Utc>) -> Vec<ThinkRequest> {
        let window = time_bucket(now, self.policy.time_bucket_secs);
        agents
            .iter()
            .filter_map(|&id| {
                let agent = world.agent(id)?;
                let prompt = ThoughtPrompt {
                    name: agent.name().to_owned(),
                    personality: agent.personality(),
                    goal: agent.goal(),
                    position: agent.position(),
                    memory: agent.memory().recent(self.policy.memory_in_prompt),
                    nearby: world.nearby_agents(
                        id,
                        self.policy.perception_radius,
                        self.policy.max_neighbors,
                        self.policy.distance_bucket,
                    ),
                };
                let fingerprint = thought_fingerprint(&prompt, self.policy.position_bucket, window);
                Some(ThinkRequest {
                    agent: id,
                    epoch: world.epoch(),
                    fingerprint,
                    prompt,
                })
            })
            .collect()
    }

    /// Resolve every request, calling backends concurrently under the
    /// shared limiter. Every request yields exactly one result, within
    /// `timeout x ceiling` of the call.
    pub async fn resolve_batch(&self, requests: &[ThinkRequest]) -> Vec<ThoughtResult> {
        let deadline = self.limiter.batch_deadline(self.timeout);
        futures::future::join_all(requests.iter().map(|r| self.resolve(r, deadline))).await
    }

    /// Resolve every request without calling a backend: cache hits are
    /// reused, everything else falls back.
    pub fn resolve_batch_degraded(&self, requests: &[ThinkRequest]) -> Vec<ThoughtResult> {
        requests
            .iter()
            .map(|r| {
                self.cache.get(r.fingerprint).map_or_else(
                    || fallback(r),
                    |text| result(r, text, ResolutionSource::Cache),
                )
            })
            .collect()
    }

    /// Queue each result as its agent's next thought. Results from an
    /// earlier epoch, or for agents that are gone, are dropped. Returns the
    /// number committed.
    pub fn commit(world: &mut World, results: Vec<ThoughtResult>) -> usize {
        let epoch = world.epoch();
        let mut committed: usize = 0;
        for r in results {
            if r.epoch != epoch {
                debug!(agent = %r.agent, "dropping thought from previous epoch");
                continue;
            }
            if let Some(agent) = world.agent_mut(r.agent) {
                agent.queue_thought(r.text);
                committed = committed.saturating_add(1);
            }
        }
        committed
    }

    async fn resolve(&self, request: &ThinkRequest, deadline: Instant) -> ThoughtResult {
        if let Some(text) = self.cache.get(request.fingerprint) {
            return result(request, text, ResolutionSource::Cache);
        }
        if !self.enabled {
            return fallback(request);
        }
        let Some(shard) = self.shards.route(request.agent) else {
            debug!(agent = %request.agent, "no generation shard configured");
            return fallback(request);
        };
        let prompt = match self.prompts.render_thought(&request.prompt) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(agent = %request.agent, error = %e, "thought prompt failed to render");
                return fallback(request);
            }
        };
        let call = GenerationRequest {
            prompt,
            model_hint: None,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        };
        match self
            .limiter
            .call_before(deadline, self.timeout, shard.backend.complete(&call))
            .await
        {
            Ok(text) => {
                self.cache.insert(request.fingerprint, text.clone());
                result(request, text, ResolutionSource::Backend)
            }
            Err(e) => {
                warn!(
                    agent = %request.agent,
                    shard = shard.index,
                    error = %e,
                    "thought generation failed, using fallback"
                );
                fallback(request)
            }
        }
    }
}

fn fallback(request: &ThinkRequest) -> ThoughtResult {
    let text = select_fallback(FallbackRequest::Thought(&request.prompt), request.fingerprint);
    result(request, text, ResolutionSource::Fallback)
}

fn result(request: &ThinkRequest, text: String, source: ResolutionSource) -> ThoughtResult {
    ThoughtResult {
        agent: request.agent,
        epoch: request.epoch,
        text,
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use agentworld_agents::{AgentConfig, WorldConfig};
    use agentworld_llm::{LlmBackend, ScriptedBackend};
    use agentworld_types::Direction;

    use super::*;

    fn world(agents: usize) -> World {
        let settings = WorldConfig {
            seed: Some(11),
            ..WorldConfig::default()
        };
        let mut world = World::new(settings, AgentConfig::default()).unwrap();
        world.reset(agents).unwrap();
        world
    }

    fn dispatcher(backends: Vec<LlmBackend>, enabled: bool) -> ThinkingDispatcher {
        let llm = LlmConfig {
            enabled,
            ..LlmConfig::default()
        };
        ThinkingDispatcher::new(
            ThinkingConfig::default(),
            &llm,
            Arc::new(PromptEngine::builtin().unwrap()),
            Arc::new(ShardPool::from_backends(backends)),
            CallLimiter::new(2),
        )
    }

    fn ids(n: u32) -> Vec<AgentId> {
        (0..n).map(AgentId).collect()
    }

    fn mentions_direction(text: &str) -> bool {
        Direction::ALL.iter().any(|d| text.contains(d.as_str()))
    }

    #[tokio::test]
    async fn no_shards_falls_back_for_everyone() {
        let world = world(4);
        let d = dispatcher(Vec::new(), true);
        let requests = d.build_requests(&world, &ids(4), Utc::now());
        let results = d.resolve_batch(&requests).await;
        assert_eq!(results.len(), 4);
        for r in &results {
            assert_eq!(r.source, ResolutionSource::Fallback);
            assert!(mentions_direction(&r.text), "{}", r.text);
        }
        assert!(d.cache().is_empty());
    }

    #[tokio::test]
    async fn backend_success_is_cached_and_reused() {
        let world = world(2);
        let scripted = Arc::new(ScriptedBackend::replying("I'll head north."));
        let d = dispatcher(vec![LlmBackend::Scripted(Arc::clone(&scripted))], true);
        let now = Utc::now();
        let requests = d.build_requests(&world, &ids(1), now);

        let first = d.resolve_batch(&requests).await;
        assert_eq!(first[0].source, ResolutionSource::Backend);
        assert_eq!(first[0].text, "I'll head north.");

        let again = d.build_requests(&world, &ids(1), now);
        let second = d.resolve_batch(&again).await;
        assert_eq!(second[0].source, ResolutionSource::Cache);
        assert_eq!(second[0].text, first[0].text);
        assert_eq!(scripted.calls(), 1);
    }

    #[tokio::test]
    async fn disabled_generation_never_calls_backend() {
        let world = world(3);
        let scripted = Arc::new(ScriptedBackend::replying("north"));
        let d = dispatcher(vec![LlmBackend::Scripted(Arc::clone(&scripted))], false);
        let requests = d.build_requests(&world, &ids(3), Utc::now());
        let results = d.resolve_batch(&requests).await;
        assert!(results.iter().all(|r| r.source == ResolutionSource::Fallback));
        assert_eq!(scripted.calls(), 0);
    }

    #[tokio::test]
    async fn failing_backend_falls_back() {
        let world = world(3);
        let d = dispatcher(vec![LlmBackend::Scripted(Arc::new(ScriptedBackend::failing("down")))], true);
        let requests = d.build_requests(&world, &ids(3), Utc::now());
        let results = d.resolve_batch(&requests).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.source == ResolutionSource::Fallback));
        assert!(d.cache().is_empty());
    }

    #[test]
    fn build_skips_unknown_agents() {
        let world = world(2);
        let d = dispatcher(Vec::new(), true);
        let requests = d.build_requests(&world, &[AgentId(0), AgentId(99)], Utc::now());
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].agent, AgentId(0));
        assert_eq!(requests[0].epoch, world.epoch());
    }

    #[test]
    fn degraded_path_matches_fallback_text() {
        let world = world(2);
        let d = dispatcher(Vec::new(), true);
        let requests = d.build_requests(&world, &ids(2), Utc::now());
        let results = d.resolve_batch_degraded(&requests);
        for (req, res) in requests.iter().zip(&results) {
            let expected = select_fallback(FallbackRequest::Thought(&req.prompt), req.fingerprint);
            assert_eq!(res.text, expected);
        }
    }

    #[test]
    fn commit_queues_thought_and_drops_stale_epoch() {
        let mut world = world(2);
        let fresh = ThoughtResult {
            agent: AgentId(0),
            epoch: world.epoch(),
            text: "go east".to_owned(),
            source: ResolutionSource::Fallback,
        };
        let stale = ThoughtResult {
            agent: AgentId(1),
            epoch: world.epoch().wrapping_sub(1),
            text: "go west".to_owned(),
            source: ResolutionSource::Fallback,
        };
        assert_eq!(ThinkingDispatcher::commit(&mut world, vec![fresh, stale]), 1);
        assert_eq!(world.agent(AgentId(0)).unwrap().next_thought(), Some("go east"));
        assert_eq!(world.agent(AgentId(1)).unwrap().next_thought(), None);
    }
}
