//! Proximity scan and the exclusive conversation-pair queue.
//!
//! Once per tick the detector walks every potential initiator. An initiator
//! that passes the check roll and has (nearly) finished its move scans all
//! other agents; for each neighbor inside the interaction radius it records
//! a "met" memory, and if both cooldowns have expired it may register a
//! conversation pair.
//!
//! The queue is exclusive: an agent id appears in at most one active pair.
//! A pair stays active from registration until the dispatcher that drained
//! it releases it, and agents in an active pair are frozen in place.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use agentworld_types::AgentId;
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;

use crate::agent::Agent;
use crate::config::AgentConfig;

/// A request for two agents to hold a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationPair {
    /// The agent that noticed the other; its shard generates the dialogue.
    pub initiator: AgentId,
    /// The other participant.
    pub partner: AgentId,
    /// When the pair was registered.
    pub requested_at: DateTime<Utc>,
}

impl ConversationPair {
    /// Whether `id` participates in this pair.
    pub fn involves(&self, id: AgentId) -> bool {
        self.initiator == id || self.partner == id
    }

    /// Whether this pair and `other` name the same two agents.
    pub fn same_agents(&self, other: &Self) -> bool {
        self.involves(other.initiator) && self.involves(other.partner)
    }
}

/// Pending and in-flight conversation pairs.
#[derive(Debug, Clone, Default)]
pub struct ConversationQueue {
    pending: VecDeque<ConversationPair>,
    in_flight: Vec<ConversationPair>,
}

impl ConversationQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pair unless either agent is already active.
    ///
    /// Returns `false` (and drops the request) for a self-pair or when either
    /// id is already pending or in flight.
    pub fn register(&mut self, initiator: AgentId, partner: AgentId, at: DateTime<Utc>) -> bool {
        if initiator == partner || self.contains(initiator) || self.contains(partner) {
            return false;
        }
        self.pending.push_back(ConversationPair {
            initiator,
            partner,
            requested_at: at,
        });
        true
    }

    /// Whether `id` is in any pending or in-flight pair.
    pub fn contains(&self, id: AgentId) -> bool {
        self.pending.iter().chain(&self.in_flight).any(|p| p.involves(id))
    }

    /// All agent ids in active pairs.
    pub fn active_ids(&self) -> BTreeSet<AgentId> {
        self.pending
            .iter()
            .chain(&self.in_flight)
            .flat_map(|p| [p.initiator, p.partner])
            .collect()
    }

    /// Move up to `max` pending pairs (all when `max` is 0) to in flight and
    /// return them in registration order.
    pub fn drain(&mut self, max: usize) -> Vec<ConversationPair> {
        let take = if max == 0 {
            self.pending.len()
        } else {
            max.min(self.pending.len())
        };
        let drained: Vec<ConversationPair> = self.pending.drain(..take).collect();
        self.in_flight.extend_from_slice(&drained);
        drained
    }

    /// Release an in-flight pair so both agents may move and converse again.
    pub fn release(&mut self, pair: &ConversationPair) {
        self.in_flight.retain(|p| !p.same_agents(pair));
    }

    /// Number of pairs waiting to be drained.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of drained pairs not yet released.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Drop every pair.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.in_flight.clear();
    }
}

/// Run one proximity scan, registering new pairs into `queue`.
///
/// Returns the number of pairs registered.
pub fn detect_interactions<R: Rng + ?Sized>(
    agents: &mut BTreeMap<AgentId, Agent>,
    queue: &mut ConversationQueue,
    config: &AgentConfig,
    rng: &mut R,
    now: DateTime<Utc>,
) -> usize {
    let ids: Vec<AgentId> = agents.keys().copied().collect();
    let mut registered: usize = 0;

    for &initiator in &ids {
        if !rng.random_bool(config.interaction_check_chance) {
            continue;
        }
        let Some(me) = agents.get(&initiator) else {
            continue;
        };
        if !me.move_enabled() || me.progress() < config.detect_min_progress {
            continue;
        }
        let origin = me.position();
        let my_name = me.name().to_owned();

        for &other in &ids {
            if other == initiator || queue.contains(initiator) || queue.contains(other) {
                continue;
            }
            let Some(them) = agents.get(&other) else {
                continue;
            };
            if origin.distance(them.position()) >= config.interaction_radius {
                continue;
            }
            let their_name = them.name().to_owned();
            let both_ready = them.conversation_cooldown() <= 0
                && agents
                    .get(&initiator)
                    .is_some_and(|a| a.conversation_cooldown() <= 0);

            if both_ready
                && rng.random_bool(config.conversation_chance)
                && queue.register(initiator, other, now)
            {
                for id in [initiator, other] {
                    if let Some(agent) = agents.get_mut(&id) {
                        agent.set_conversation_cooldown(config.conversation_cooldown);
                    }
                }
                registered = registered.saturating_add(1);
                debug!(%initiator, partner = %other, "conversation pair registered");
            }

            if let Some(me) = agents.get_mut(&initiator) {
                me.remember(&format!("{my_name} met {their_name} at {origin}"));
            }
        }
    }
    registered
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use agentworld_types::{Goal, Personality, Position};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::agent::AgentIdentity;

    fn spawn(agents: &mut BTreeMap<AgentId, Agent>, id: u32, name: &str, x: i32, y: i32) {
        let identity = AgentIdentity {
            id: AgentId(id),
            name: name.to_owned(),
            color: "red".to_owned(),
            personality: Personality::Social,
            goal: Goal::MeetEveryone,
        };
        agents.insert(AgentId(id), Agent::new(identity, Position::new(x, y), 10));
    }

    fn eager() -> AgentConfig {
        AgentConfig {
            interaction_check_chance: 1.0,
            conversation_chance: 1.0,
            ..AgentConfig::default()
        }
    }

    #[test]
    fn register_rejects_agents_already_queued() {
        let mut queue = ConversationQueue::new();
        let now = Utc::now();
        assert!(queue.register(AgentId(0), AgentId(1), now));
        assert!(!queue.register(AgentId(1), AgentId(2), now));
        assert!(!queue.register(AgentId(2), AgentId(0), now));
        assert!(!queue.register(AgentId(3), AgentId(3), now));
        assert!(queue.register(AgentId(2), AgentId(3), now));
        assert_eq!(queue.pending_len(), 2);
    }

    #[test]
    fn drained_pairs_stay_active_until_released() {
        let mut queue = ConversationQueue::new();
        let now = Utc::now();
        queue.register(AgentId(0), AgentId(1), now);
        queue.register(AgentId(2), AgentId(3), now);

        let drained = queue.drain(1);
        assert_eq!(drained.len(), 1);
        assert_eq!(queue.pending_len(), 1);
        assert!(queue.contains(AgentId(0)));
        assert!(!queue.register(AgentId(0), AgentId(4), now));

        queue.release(drained.first().unwrap());
        assert!(!queue.contains(AgentId(0)));
        assert_eq!(queue.drain(0).len(), 1);
        assert_eq!(queue.in_flight_len(), 1);
    }

    #[test]
    fn close_agents_form_one_pair_and_set_cooldowns() {
        let mut agents = BTreeMap::new();
        spawn(&mut agents, 0, "Ava", 200, 200);
        spawn(&mut agents, 1, "Neo", 210, 200);
        let mut queue = ConversationQueue::new();
        let mut rng = SmallRng::seed_from_u64(1);

        let n = detect_interactions(&mut agents, &mut queue, &eager(), &mut rng, Utc::now());
        assert_eq!(n, 1);
        assert_eq!(queue.pending_len(), 1);
        for agent in agents.values() {
            assert!(agent.conversation_cooldown() > 0);
        }
        let ava = agents.get(&AgentId(0)).unwrap();
        assert!(ava.memory().to_vec().first().unwrap().ends_with("Ava met Neo at (200, 200)"));
    }

    #[test]
    fn no_agent_appears_twice_in_a_crowd() {
        let mut agents = BTreeMap::new();
        for id in 0..8 {
            spawn(&mut agents, id, "Agent", 200, 200);
        }
        let mut queue = ConversationQueue::new();
        let mut rng = SmallRng::seed_from_u64(2);
        detect_interactions(&mut agents, &mut queue, &eager(), &mut rng, Utc::now());

        let pairs = queue.drain(0);
        assert_eq!(pairs.len(), 4);
        let mut seen = BTreeSet::new();
        for pair in pairs {
            assert!(seen.insert(pair.initiator));
            assert!(seen.insert(pair.partner));
        }
    }

    #[test]
    fn cooldown_blocks_new_pairs_but_not_meetings() {
        let mut agents = BTreeMap::new();
        spawn(&mut agents, 0, "Ava", 200, 200);
        spawn(&mut agents, 1, "Neo", 205, 205);
        agents.get_mut(&AgentId(1)).unwrap().set_conversation_cooldown(1);
        let mut queue = ConversationQueue::new();
        let mut rng = SmallRng::seed_from_u64(3);

        let n = detect_interactions(&mut agents, &mut queue, &eager(), &mut rng, Utc::now());
        assert_eq!(n, 0);
        assert_eq!(agents.get(&AgentId(0)).unwrap().memory().len(), 1);
        assert_eq!(agents.get(&AgentId(1)).unwrap().memory().len(), 1);
    }

    #[test]
    fn distant_agents_do_not_meet() {
        let mut agents = BTreeMap::new();
        spawn(&mut agents, 0, "Ava", 150, 150);
        spawn(&mut agents, 1, "Neo", 350, 300);
        let mut queue = ConversationQueue::new();
        let mut rng = SmallRng::seed_from_u64(4);

        assert_eq!(detect_interactions(&mut agents, &mut queue, &eager(), &mut rng, Utc::now()), 0);
        assert!(agents.values().all(|a| a.memory().is_empty()));
    }
}
