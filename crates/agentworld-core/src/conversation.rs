//! Conversation dispatcher and the rolling conversation log.
//!
//! Pairs drained from the world are resolved the same way thoughts are:
//! cache, then the initiator's shard under the shared limiter, then a
//! template fallback. Whatever the path, committing a dialogue writes one
//! log entry and a "talked with" memory for both agents, and releases the
//! pair so the two agents can move again.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use agentworld_agents::{ConversationPair, World};
use agentworld_llm::{
    DialoguePrompt, FallbackRequest, GenerationRequest, Participant, PromptEngine, ShardPool,
    select_fallback,
};
use agentworld_types::AgentId;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};

use crate::cache::GenerationCache;
use crate::config::{ConversationConfig, LlmConfig};
use crate::fingerprint::{dialogue_fingerprint, time_bucket};
use crate::limiter::CallLimiter;
use crate::thinking::ResolutionSource;

/// Clauses appended to a reused dialogue line so repeats read differently.
const CONTINUATIONS: [&str; 6] = [
    " Anyway.",
    " Don't you think?",
    " Or so I hear.",
    " Let's see.",
    " Right?",
    " Ha!",
];

// ---------------------------------------------------------------------------
// Conversation log
// ---------------------------------------------------------------------------

/// Bounded FIFO of rendered dialogues, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl ConversationLog {
    /// Empty log holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `text` as `"[HH:MM:SS] text"`, evicting the oldest entry when
    /// full.
    pub fn push(&mut self, at: DateTime<Utc>, text: &str) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries
            .push_back(format!("[{}] {text}", at.format("%H:%M:%S")));
    }

    /// Copy entries, oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// Requests and results
// ---------------------------------------------------------------------------

/// One pair waiting for a dialogue.
#[derive(Debug, Clone)]
pub struct DialogueRequest {
    /// The drained pair.
    pub pair: ConversationPair,
    /// World epoch the request was built against.
    pub epoch: u64,
    /// Cache key.
    pub fingerprint: u64,
    /// Prompt context.
    pub prompt: DialoguePrompt,
}

/// A resolved dialogue, ready to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueResult {
    /// The pair that spoke.
    pub pair: ConversationPair,
    /// World epoch the request was built against.
    pub epoch: u64,
    /// The dialogue text.
    pub text: String,
    /// How it was produced.
    pub source: ResolutionSource,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Resolves conversation batches.
#[derive(Debug)]
pub struct ConversationDispatcher {
    policy: ConversationConfig,
    enabled: bool,
    timeout: Duration,
    max_tokens: u32,
    prompts: Arc<PromptEngine>,
    shards: Arc<ShardPool>,
    limiter: CallLimiter,
    cache: GenerationCache,
}

impl ConversationDispatcher {
    /// Build a dispatcher sharing `prompts`, `shards`, and `limiter` with
    /// the thinking dispatcher.
    pub fn new(
        policy: ConversationConfig,
        llm: &LlmConfig,
        prompts: Arc<PromptEngine>,
        shards: Arc<ShardPool>,
        limiter: CallLimiter,
    ) -> Self {
        let cache = GenerationCache::new("dialogue", policy.cache_capacity);
        Self {
            policy,
            enabled: llm.enabled,
            timeout: Duration::from_millis(llm.dialogue_timeout_ms),
            max_tokens: llm.dialogue_max_tokens,
            prompts,
            shards,
            limiter,
            cache,
        }
    }

    /// The dialogue cache.
    pub const fn cache(&self) -> &GenerationCache {
        &self.cache
    }

    /// Maximum log length.
    pub const fn max_log(&self) -> usize {
        self.policy.max_log
    }

    /// Build requests for drained `pairs`. A pair naming an agent that no
    /// longer exists is released and skipped.
    pub fn build_requests(
        &self,
        world: &mut World,
        pairs: Vec<ConversationPair>,
        now: DateTime<Utc>,
    ) -> Vec<DialogueRequest> {
        let window = time_bucket(now, self.policy.time_bucket_secs);
        let epoch = world.epoch();
        let mut requests = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let (Some(initiator), Some(partner)) =
                (participant(world, pair.initiator), participant(world, pair.partner))
            else {
                debug!(initiator = %pair.initiator, partner = %pair.partner, "dropping stale pair");
                world.release_conversation(&pair);
                continue;
            };
            let prompt = DialoguePrompt { initiator, partner };
            requests.push(DialogueRequest {
                pair,
                epoch,
                fingerprint: dialogue_fingerprint(&prompt, window),
                prompt,
            });
        }
        requests
    }

    /// Resolve every request, calling backends concurrently under the
    /// shared limiter. Every request yields exactly one result, within
    /// `timeout x ceiling` of the call.
    pub async fn resolve_batch(&self, requests: &[DialogueRequest]) -> Vec<DialogueResult> {
        let deadline = self.limiter.batch_deadline(self.timeout);
        futures::future::join_all(requests.iter().map(|r| self.resolve(r, deadline))).await
    }

    /// Resolve every request without calling a backend: cache hits are
    /// reused (with variation), everything else falls back.
    pub fn resolve_batch_degraded(&self, requests: &[DialogueRequest]) -> Vec<DialogueResult> {
        requests
            .iter()
            .map(|r| self.cached(r).unwrap_or_else(|| fallback(r)))
            .collect()
    }

    /// Release and record each dialogue whose epoch still matches: one log
    /// entry, and a "talked with" memory for both agents. Returns the
    /// number of dialogues recorded.
    pub fn commit(
        world: &mut World,
        log: &mut ConversationLog,
        results: Vec<DialogueResult>,
        now: DateTime<Utc>,
    ) -> usize {
        let epoch = world.epoch();
        let mut committed: usize = 0;
        for r in results {
            // A reset already cleared the queue; releasing would hit a
            // fresh pair over the same ids.
            if r.epoch != epoch {
                debug!(initiator = %r.pair.initiator, "dropping dialogue from previous epoch");
                continue;
            }
            world.release_conversation(&r.pair);
            let names = world
                .agent(r.pair.initiator)
                .zip(world.agent(r.pair.partner))
                .map(|(a, b)| (a.name().to_owned(), b.name().to_owned()));
            let Some((a, b)) = names else {
                continue;
            };
            log.push(now, &r.text);
            if let Some(agent) = world.agent_mut(r.pair.initiator) {
                agent.remember(&format!("{a} talked with {b}"));
            }
            if let Some(agent) = world.agent_mut(r.pair.partner) {
                agent.remember(&format!("{b} talked with {a}"));
            }
            info!(initiator = %a, partner = %b, source = ?r.source, "conversation recorded");
            committed = committed.saturating_add(1);
        }
        committed
    }

    async fn resolve(&self, request: &DialogueRequest, deadline: Instant) -> DialogueResult {
        if let Some(hit) = self.cached(request) {
            return hit;
        }
        if !self.enabled {
            return fallback(request);
        }
        let Some(shard) = self.shards.route(request.pair.initiator) else {
            debug!(initiator = %request.pair.initiator, "no generation shard configured");
            return fallback(request);
        };
        let prompt = match self.prompts.render_dialogue(&request.prompt) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "dialogue prompt failed to render");
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
                    initiator = %request.prompt.initiator.name,
                    partner = %request.prompt.partner.name,
                    shard = shard.index,
                    error = %e,
                    "dialogue generation failed, using fallback"
                );
                fallback(request)
            }
        }
    }

    fn cached(&self, request: &DialogueRequest) -> Option<DialogueResult> {
        let text = self.cache.get(request.fingerprint)?;
        Some(result(request, perturb(&text, &mut rand::rng()), ResolutionSource::Cache))
    }
}

/// Append a short continuation clause to one randomly chosen line.
pub fn perturb<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return text.to_owned();
    }
    let chosen = rng.random_range(0..lines.len());
    let clause = CONTINUATIONS.choose(rng).copied().unwrap_or(" Anyway.");
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == chosen {
                format!("{}{clause}", line.trim_end())
            } else {
                (*line).to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn participant(world: &World, id: AgentId) -> Option<Participant> {
    let agent = world.agent(id)?;
    Some(Participant {
        name: agent.name().to_owned(),
        personality: agent.personality(),
        goal: agent.goal(),
        position: agent.position(),
    })
}

fn fallback(request: &DialogueRequest) -> DialogueResult {
    let text = select_fallback(FallbackRequest::Dialogue(&request.prompt), request.fingerprint);
    result(request, text, ResolutionSource::Fallback)
}

fn result(request: &DialogueRequest, text: String, source: ResolutionSource) -> DialogueResult {
    DialogueResult {
        pair: request.pair,
        epoch: request.epoch,
        text,
        source,
    }
}
