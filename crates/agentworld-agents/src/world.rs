//! The world: agent collection, spawn/reset policy, and the per-tick move
//! and detection pass.
//!
//! The world owns its own RNG so that a seeded world replays identically.
//! Structural changes (agent creation and removal) happen only in
//! [`World::reset`], which also bumps the epoch so that results computed
//! against the previous population can be recognised as stale.

use std::collections::{BTreeMap, VecDeque};

use agentworld_types::{AgentId, AgentSnapshot, Goal, NearbyAgent, Personality, Position};
use chrono::{DateTime, Utc};
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::agent::{Agent, AgentIdentity};
use crate::config::{ActivityArea, AgentConfig, WorldConfig};
use crate::error::WorldError;
use crate::interaction::{ConversationPair, ConversationQueue, detect_interactions};

/// Base names handed out in spawn order.
pub const AGENT_NAMES: [&str; 10] = [
    "Ava", "Neo", "Luna", "Orion", "Zephyr", "Nova", "Atlas", "Echo", "Iris", "Milo",
];

/// What one call to [`World::step`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Agents newly queued for thinking.
    pub thinkers_queued: usize,
    /// Conversation pairs newly registered.
    pub pairs_registered: usize,
}

/// The simulated world.
#[derive(Debug)]
pub struct World {
    settings: WorldConfig,
    config: AgentConfig,
    agents: BTreeMap<AgentId, Agent>,
    conversations: ConversationQueue,
    thinking: VecDeque<AgentId>,
    epoch: u64,
    rng: SmallRng,
}

impl World {
    /// Build an empty world after validating both configs.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] when either config is invalid.
    pub fn new(settings: WorldConfig, config: AgentConfig) -> Result<Self, WorldError> {
        settings.validate()?;
        config.validate()?;
        let rng = settings
            .seed
            .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
        Ok(Self {
            settings,
            config,
            agents: BTreeMap::new(),
            conversations: ConversationQueue::new(),
            thinking: VecDeque::new(),
            epoch: 0,
            rng,
        })
    }

    /// Replace the population with `count` fresh agents (capped at
    /// `max_agents`), dropping every queued request. Returns the number of
    /// agents spawned.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidAgentCount`] when `count` is zero.
    pub fn reset(&mut self, count: usize) -> Result<usize, WorldError> {
        if count == 0 {
            return Err(WorldError::InvalidAgentCount { requested: count });
        }
        let count = count.min(self.settings.max_agents);
        self.agents.clear();
        self.conversations.clear();
        self.thinking.clear();
        self.epoch = self.epoch.wrapping_add(1);

        let area = self.settings.activity_area;
        for index in 0..count {
            let Ok(raw) = u32::try_from(index) else {
                break;
            };
            let id = AgentId(raw);
            let identity = AgentIdentity {
                id,
                name: agent_name(index),
                color: self
                    .settings
                    .colors
                    .get(index.checked_rem(self.settings.colors.len()).unwrap_or(0))
                    .cloned()
                    .unwrap_or_default(),
                personality: Personality::ALL
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(Personality::Curious),
                goal: Goal::ALL.choose(&mut self.rng).copied().unwrap_or(Goal::Explore),
            };
            let position = Position::new(
                self.rng.random_range(area.min_x..=area.max_x),
                self.rng.random_range(area.min_y..=area.max_y),
            );
            self.agents
                .insert(id, Agent::new(identity, position, self.config.max_memory));
        }
        info!(agents = self.agents.len(), epoch = self.epoch, "world reset");
        Ok(self.agents.len())
    }

    /// Run one move pass and one detection pass.
    ///
    /// Agents in an active conversation pair stay frozen. Agents that become
    /// eligible to think are queued for [`World::drain_thinkers`].
    pub fn step(&mut self, now: DateTime<Utc>) -> StepOutcome {
        let frozen = self.conversations.active_ids();
        let area = self.settings.activity_area;
        let mut outcome = StepOutcome::default();

        for (id, agent) in &mut self.agents {
            let wants = agent.step(frozen.contains(id), area, &self.config, &mut self.rng);
            if wants && !self.thinking.contains(id) {
                self.thinking.push_back(*id);
                outcome.thinkers_queued = outcome.thinkers_queued.saturating_add(1);
            }
        }

        outcome.pairs_registered = detect_interactions(
            &mut self.agents,
            &mut self.conversations,
            &self.config,
            &mut self.rng,
            now,
        );
        debug!(
            thinkers = outcome.thinkers_queued,
            pairs = outcome.pairs_registered,
            "world stepped"
        );
        outcome
    }

    /// Take every agent queued for thinking.
    pub fn drain_thinkers(&mut self) -> Vec<AgentId> {
        self.thinking.drain(..).collect()
    }

    /// Take up to `max` pending conversation pairs (all when 0). Drained
    /// pairs stay active until [`World::release_conversation`].
    pub fn drain_conversations(&mut self, max: usize) -> Vec<ConversationPair> {
        self.conversations.drain(max)
    }

    /// Release a drained pair.
    pub fn release_conversation(&mut self, pair: &ConversationPair) {
        self.conversations.release(pair);
    }

    /// Up to `max` other agents closer than `radius` to `id`, nearest first,
    /// with distances rounded down to multiples of `bucket`.
    pub fn nearby_agents(&self, id: AgentId, radius: f64, max: usize, bucket: u32) -> Vec<NearbyAgent> {
        let Some(me) = self.agents.get(&id) else {
            return Vec::new();
        };
        let origin = me.position();
        let mut near: Vec<(f64, &Agent)> = self
            .agents
            .values()
            .filter(|a| a.id() != id)
            .map(|a| (origin.distance(a.position()), a))
            .filter(|(d, _)| *d < radius)
            .collect();
        near.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id().cmp(&b.1.id())));
        near.into_iter()
            .take(max)
            .map(|(d, a)| NearbyAgent {
                name: a.name().to_owned(),
                distance: bucket_distance(d, bucket),
                personality: a.personality(),
            })
            .collect()
    }

    /// Snapshot every agent in id order.
    pub fn snapshot(&self) -> Vec<AgentSnapshot> {
        self.agents.values().map(Agent::snapshot).collect()
    }

    /// Look up an agent.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Look up an agent mutably.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Iterate agents in id order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the world has no agents.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Reset counter; changes whenever the population is replaced.
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The activity rectangle.
    pub const fn area(&self) -> ActivityArea {
        self.settings.activity_area
    }

    /// World settings.
    pub const fn settings(&self) -> &WorldConfig {
        &self.settings
    }

    /// Agent policy.
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Conversation queue, for inspection.
    pub const fn conversations(&self) -> &ConversationQueue {
        &self.conversations
    }
}

/// Name for the agent spawned at `index`: the base names in order, then
/// with a numeric suffix (`"Ava 2"`) once they run out.
pub fn agent_name(index: usize) -> String {
    let base = AGENT_NAMES
        .get(index.checked_rem(AGENT_NAMES.len()).unwrap_or(0))
        .copied()
        .unwrap_or("Agent");
    let round = index.checked_div(AGENT_NAMES.len()).unwrap_or(0);
    if round == 0 {
        base.to_owned()
    } else {
        format!("{base} {}", round.saturating_add(1))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bucket_distance(distance: f64, bucket: u32) -> u32 {
    let whole = distance.max(0.0) as u32;
    whole
        .checked_div(bucket)
        .map_or(whole, |q| q.saturating_mul(bucket))
}
