//! The process-wide simulation context.
//!
//! [`SimulationContext`] is built once at startup and shared behind an
//! [`Arc`](std::sync::Arc) by the scheduler and the transport. It owns the
//! world and the conversation log (behind one async `RwLock`), the control
//! atomics, both dispatchers, and the event channel.
//!
//! # Tick phases
//!
//! 1. **Step** (write lock): move agents, detect interactions, drain the
//!    thinking and conversation queues into requests.
//! 2. **Resolve** (no lock): both dispatchers resolve their batches
//!    concurrently, bounded by the shared limiter.
//! 3. **Commit** (write lock): results are written back, stale ones
//!    dropped, snapshots taken.
//! 4. **Publish**: events go out after the lock is released.
//!
//! The lock is never held across a backend call, so snapshots and resets
//! never wait on generation.

use std::sync::Arc;

use agentworld_agents::{StepOutcome, World, WorldError};
use agentworld_llm::{PromptEngine, ShardPool};
use agentworld_types::{AgentId, AgentSnapshot, SimulationEvent, SimulationStatus};
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockReadGuard, broadcast};
use tracing::{debug, info, trace};

use crate::config::{ConfigError, SimulationConfig};
use crate::conversation::{
    ConversationDispatcher, ConversationLog, DialogueRequest, DialogueResult,
};
use crate::error::TickError;
use crate::limiter::CallLimiter;
use crate::operator::ControlState;
use crate::thinking::{ResolutionSource, ThinkRequest, ThinkingDispatcher, ThoughtResult};

/// Buffered events per subscriber before a slow one starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Mutable simulation state guarded by the context lock.
#[derive(Debug)]
pub struct SimulationState {
    /// Agents, pair queue, thinking queue.
    pub world: World,
    /// Rolling conversation log.
    pub log: ConversationLog,
}

/// Summary of one working tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number.
    pub tick: u64,
    /// Agents in the world.
    pub agents: usize,
    /// What the move and detection pass did.
    pub step: StepOutcome,
    /// Thoughts queued on agents.
    pub thoughts: usize,
    /// Dialogues recorded in the log.
    pub conversations: usize,
    /// Results that came from templates.
    pub fallbacks: usize,
}

/// Shared handle to everything the scheduler and transport need.
#[derive(Debug)]
pub struct SimulationContext {
    state: RwLock<SimulationState>,
    control: ControlState,
    thinking: ThinkingDispatcher,
    conversations: ConversationDispatcher,
    events: broadcast::Sender<SimulationEvent>,
    max_pairs_per_tick: usize,
}

impl SimulationContext {
    /// Build a context with an empty world.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::World`] for an invalid world or agent policy
    /// and [`ConfigError::Prompt`] if a template override fails to load.
    pub fn new(config: &SimulationConfig, shards: ShardPool) -> Result<Self, ConfigError> {
        let world = World::new(config.world.clone(), config.agents.clone())?;
        let prompts = Arc::new(PromptEngine::new(config.llm.templates_dir.as_deref())?);
        let shards = Arc::new(shards);
        let limiter = CallLimiter::new(config.llm.max_concurrent_calls);
        let thinking = ThinkingDispatcher::new(
            config.thinking.clone(),
            &config.llm,
            Arc::clone(&prompts),
            Arc::clone(&shards),
            limiter.clone(),
        );
        let conversations = ConversationDispatcher::new(
            config.conversation.clone(),
            &config.llm,
            prompts,
            Arc::clone(&shards),
            limiter,
        );
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(
            shards = shards.len(),
            generation_enabled = config.llm.enabled,
            max_concurrent_calls = config.llm.max_concurrent_calls,
            "simulation context ready"
        );
        Ok(Self {
            state: RwLock::new(SimulationState {
                world,
                log: ConversationLog::new(config.conversation.max_log),
            }),
            control: ControlState::new(config.world.tick_interval_ms),
            thinking,
            conversations,
            events,
            max_pairs_per_tick: config.conversation.max_pairs_per_tick,
        })
    }

    // -----------------------------------------------------------------------
    // Control surface
    // -----------------------------------------------------------------------

    /// Run flag, interval, and tick counter.
    pub const fn control(&self) -> &ControlState {
        &self.control
    }

    /// Let subsequent ticks perform work.
    pub fn start(&self) {
        if !self.control.start() {
            info!("simulation started");
        }
    }

    /// Make subsequent ticks idle.
    pub fn stop(&self) {
        if self.control.stop() {
            info!("simulation stopped");
        }
    }

    /// Change the tick interval. Returns the previous value, or `None` for
    /// a zero interval.
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        let prev = self.control.set_tick_interval_ms(ms)?;
        info!(from = prev, to = ms, "tick interval changed");
        Some(prev)
    }

    /// Replace the population with `count` fresh agents and clear the
    /// conversation log. The run state is left alone. Returns the number
    /// of agents spawned.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidAgentCount`] when `count` is zero.
    pub async fn reset(&self, count: usize) -> Result<usize, WorldError> {
        let (spawned, snapshot) = {
            let mut state = self.state.write().await;
            let spawned = state.world.reset(count)?;
            state.log.clear();
            (spawned, state.world.snapshot())
        };
        self.publish(SimulationEvent::AgentUpdate(snapshot));
        self.publish(SimulationEvent::ConversationUpdate(Vec::new()));
        Ok(spawned)
    }

    /// Every agent, in id order.
    pub async fn snapshot(&self) -> Vec<AgentSnapshot> {
        self.state.read().await.world.snapshot()
    }

    /// One agent, if it exists.
    pub async fn agent(&self, id: AgentId) -> Option<AgentSnapshot> {
        self.state.read().await.world.agent(id).map(agentworld_agents::Agent::snapshot)
    }

    /// The conversation log, oldest first.
    pub async fn conversation_log(&self) -> Vec<String> {
        self.state.read().await.log.to_vec()
    }

    /// Run state and counters.
    pub async fn status(&self) -> SimulationStatus {
        let (agents, conversations) = {
            let state = self.state.read().await;
            (state.world.len(), state.log.len())
        };
        SimulationStatus {
            running: self.control.is_running(),
            tick: self.control.tick(),
            tick_interval_ms: self.control.tick_interval_ms(),
            agents: u32::try_from(agents).unwrap_or(u32::MAX),
            conversations: u32::try_from(conversations).unwrap_or(u32::MAX),
            started_at: self.control.started_at().to_rfc3339(),
        }
    }

    /// Read access to the world and log, for inspection.
    pub async fn state(&self) -> RwLockReadGuard<'_, SimulationState> {
        self.state.read().await
    }

    /// A receiver for every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.events.subscribe()
    }

    /// Fan `event` out to every subscriber.
    pub fn publish(&self, event: SimulationEvent) {
        let kind = event.kind();
        if self.events.send(event).is_err() {
            trace!(kind, "no subscribers for event");
        }
    }

    /// The thinking dispatcher.
    pub const fn thinking(&self) -> &ThinkingDispatcher {
        &self.thinking
    }

    /// The conversation dispatcher.
    pub const fn conversations(&self) -> &ConversationDispatcher {
        &self.conversations
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one working tick regardless of the run flag.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::TickOverflow`] if the tick counter is exhausted.
    pub async fn tick(&self) -> Result<TickSummary, TickError> {
        let tick = self.control.advance_tick()?;
        let now = Utc::now();

        let (step, thought_requests, dialogue_requests) = {
            let mut state = self.state.write().await;
            self.step(&mut state, now)
        };

        let (thoughts, dialogues) = tokio::join!(
            self.thinking.resolve_batch(&thought_requests),
            self.conversations.resolve_batch(&dialogue_requests),
        );

        let (summary, events) = {
            let mut state = self.state.write().await;
            Self::commit(&mut state, tick, step, thoughts, dialogues)
        };
        events.into_iter().for_each(|e| self.publish(e));
        Ok(summary)
    }

    /// [`tick`](Self::tick) for callers outside an async runtime.
    ///
    /// Uses the degraded dispatch path: cache hits are reused and every
    /// miss falls back, so no backend is called. Must not be called from
    /// within a runtime thread.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::TickOverflow`] if the tick counter is exhausted.
    pub fn tick_blocking(&self) -> Result<TickSummary, TickError> {
        let tick = self.control.advance_tick()?;
        let (summary, events) = {
            let mut state = self.state.blocking_write();
            let (step, thought_requests, dialogue_requests) = self.step(&mut state, Utc::now());
            let thoughts = self.thinking.resolve_batch_degraded(&thought_requests);
            let dialogues = self.conversations.resolve_batch_degraded(&dialogue_requests);
            Self::commit(&mut state, tick, step, thoughts, dialogues)
        };
        events.into_iter().for_each(|e| self.publish(e));
        Ok(summary)
    }

    fn step(
        &self,
        state: &mut SimulationState,
        now: DateTime<Utc>,
    ) -> (StepOutcome, Vec<ThinkRequest>, Vec<DialogueRequest>) {
        let step = state.world.step(now);
        let thinkers = state.world.drain_thinkers();
        let pairs = state.world.drain_conversations(self.max_pairs_per_tick);
        let thoughts = self.thinking.build_requests(&state.world, &thinkers, now);
        let dialogues = self.conversations.build_requests(&mut state.world, pairs, now);
        (step, thoughts, dialogues)
    }

    /// Write results back; returns the events to publish once the lock is
    /// released.
    fn commit(
        state: &mut SimulationState,
        tick: u64,
        step: StepOutcome,
        thoughts: Vec<ThoughtResult>,
        dialogues: Vec<DialogueResult>,
    ) -> (TickSummary, Vec<SimulationEvent>) {
        let fallbacks = thoughts
            .iter()
            .map(|t| t.source)
            .chain(dialogues.iter().map(|d| d.source))
            .filter(|s| *s == ResolutionSource::Fallback)
            .count();
        let thoughts = ThinkingDispatcher::commit(&mut state.world, thoughts);
        let conversations =
            ConversationDispatcher::commit(&mut state.world, &mut state.log, dialogues, Utc::now());

        let summary = TickSummary {
            tick,
            agents: state.world.len(),
            step,
            thoughts,
            conversations,
            fallbacks,
        };
        let mut events = vec![SimulationEvent::AgentUpdate(state.world.snapshot())];
        if conversations > 0 {
            events.push(SimulationEvent::ConversationUpdate(state.log.to_vec()));
        }
        debug!(
            tick,
            agents = summary.agents,
            thinkers = step.thinkers_queued,
            pairs = step.pairs_registered,
            thoughts,
            conversations,
            fallbacks,
            "tick complete"
        );
        (summary, events)
    }
}
