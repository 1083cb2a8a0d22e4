//! Per-agent movement state machine.
//!
//! An agent is `Idle` when its progress is 1.0 and no target is queued, and
//! `Moving` otherwise. Each call to [`Agent::step`] advances one tick:
//!
//! - **Moving**: progress advances by `progress_step`, position is recomputed
//!   as the eased interpolation of `last -> target`. Past the prefetch
//!   threshold a queued target is prepared early so motion does not pause.
//! - **Idle**: the thinking cooldown ticks down (or, once expired, the agent
//!   may become eligible to think), a direction is chosen from the agent's
//!   thought, and a new target is prepared. The conversation cooldown ticks
//!   down on every idle tick.
//!
//! Agents listed in an active conversation pair are frozen and do not step.

use std::collections::VecDeque;

use agentworld_types::{AgentId, AgentSnapshot, Goal, Personality, Position};
use rand::Rng;
use tracing::trace;

use crate::config::{ActivityArea, AgentConfig};
use crate::memory::MemoryRing;
use crate::movement::{calculate_target, extract_direction, heading, interpolate, random_direction};

/// Immutable identity assigned at spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    /// Stable identifier, unique within one world epoch.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Renderer color tag.
    pub color: String,
    /// Personality drawn at spawn.
    pub personality: Personality,
    /// Goal drawn at spawn.
    pub goal: Goal,
}

/// One simulated agent.
#[derive(Debug, Clone)]
pub struct Agent {
    identity: AgentIdentity,
    position: Position,
    last_position: Position,
    target: Position,
    progress: f64,
    movement_queue: VecDeque<Position>,
    memory: MemoryRing,
    last_thought: String,
    next_thought: Option<String>,
    thinking_cooldown: u32,
    conversation_cooldown: i32,
    move_enabled: bool,
}

impl Agent {
    /// Spawn an idle agent at `position` with an empty memory.
    pub fn new(identity: AgentIdentity, position: Position, max_memory: usize) -> Self {
        Self {
            identity,
            position,
            last_position: position,
            target: position,
            progress: 1.0,
            movement_queue: VecDeque::new(),
            memory: MemoryRing::new(max_memory),
            last_thought: String::new(),
            next_thought: None,
            thinking_cooldown: 0,
            conversation_cooldown: 0,
            move_enabled: true,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Agent identifier.
    pub const fn id(&self) -> AgentId {
        self.identity.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Full identity.
    pub const fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Personality tag.
    pub const fn personality(&self) -> Personality {
        self.identity.personality
    }

    /// Goal tag.
    pub const fn goal(&self) -> Goal {
        self.identity.goal
    }

    /// Current position.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Position at the start of the current move.
    pub const fn last_position(&self) -> Position {
        self.last_position
    }

    /// Target of the current move.
    pub const fn target(&self) -> Position {
        self.target
    }

    /// Movement progress in `[0, 1]`.
    pub const fn progress(&self) -> f64 {
        self.progress
    }

    /// Whether the agent has arrived and has nothing queued.
    pub fn is_idle(&self) -> bool {
        self.progress >= 1.0 && self.movement_queue.is_empty()
    }

    /// Number of targets waiting behind the current move.
    pub fn queued_targets(&self) -> usize {
        self.movement_queue.len()
    }

    /// Recent memories.
    pub const fn memory(&self) -> &MemoryRing {
        &self.memory
    }

    /// The thought the agent most recently acted on.
    pub fn last_thought(&self) -> &str {
        &self.last_thought
    }

    /// Thought waiting to be adopted on the next idle tick.
    pub fn next_thought(&self) -> Option<&str> {
        self.next_thought.as_deref()
    }

    /// Ticks remaining before another thinking opportunity.
    pub const fn thinking_cooldown(&self) -> u32 {
        self.thinking_cooldown
    }

    /// Conversation refractory counter; the agent may converse when `<= 0`.
    pub const fn conversation_cooldown(&self) -> i32 {
        self.conversation_cooldown
    }

    /// Whether the agent moves on its own.
    pub const fn move_enabled(&self) -> bool {
        self.move_enabled
    }

    // -----------------------------------------------------------------------
    // Mutation from dispatchers and the detector
    // -----------------------------------------------------------------------

    /// Record an event in memory, stamped with the wall clock.
    pub fn remember(&mut self, event: &str) {
        self.memory.remember(event);
    }

    /// Queue a thought to be adopted on the next idle tick.
    pub fn queue_thought(&mut self, thought: String) {
        self.next_thought = Some(thought);
    }

    /// Set the conversation refractory counter.
    pub const fn set_conversation_cooldown(&mut self, ticks: i32) {
        self.conversation_cooldown = ticks;
    }

    /// Enable or disable autonomous movement.
    pub const fn set_move_enabled(&mut self, enabled: bool) {
        self.move_enabled = enabled;
    }

    /// Append a target behind the current move.
    pub fn enqueue_target(&mut self, target: Position) {
        self.movement_queue.push_back(target);
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the agent by one tick.
    ///
    /// Returns `true` when the agent became eligible to think this tick.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        frozen: bool,
        area: ActivityArea,
        config: &AgentConfig,
        rng: &mut R,
    ) -> bool {
        if !self.move_enabled || frozen {
            return false;
        }

        if self.progress < 1.0 {
            self.progress = (self.progress + config.progress_step).min(1.0);
            self.position = interpolate(self.last_position, self.target, self.progress);
            if self.progress >= config.prefetch_threshold
                && let Some(next) = self.movement_queue.pop_front()
            {
                self.prepare(next, area);
            }
            return false;
        }

        let mut wants_to_think = false;
        if self.movement_queue.is_empty() {
            if self.thinking_cooldown > 0 {
                self.thinking_cooldown = self.thinking_cooldown.saturating_sub(1);
            } else if rng.random_bool(config.think_chance) {
                wants_to_think = true;
                self.thinking_cooldown = config.think_cooldown;
            }

            if let Some(thought) = self.next_thought.take() {
                self.last_thought = thought;
            }
            let direction = if self.last_thought.is_empty() {
                random_direction(rng)
            } else {
                extract_direction(&self.last_thought, rng)
            };
            let target = calculate_target(self.position, direction, area, config, rng);
            self.movement_queue.push_back(target);
        }
        if let Some(next) = self.movement_queue.pop_front() {
            self.prepare(next, area);
        }
        self.conversation_cooldown = self.conversation_cooldown.saturating_sub(1);
        wants_to_think
    }

    /// Start a move toward `target`, clamped into `area`.
    ///
    /// A target equal to the current position leaves the agent idle and
    /// records nothing.
    fn prepare(&mut self, target: Position, area: ActivityArea) {
        self.last_position = self.position;
        self.target = area.clamp(target);
        if self.target == self.position {
            self.progress = 1.0;
            return;
        }
        self.progress = 0.0;
        let direction = heading(self.position, self.target);
        trace!(agent = %self.identity.id, %direction, target = %self.target, "move prepared");
        let event = format!("{} moved {direction} to {}", self.identity.name, self.target);
        self.memory.remember(&event);
    }

    /// Point-in-time view for observers.
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.identity.id,
            name: self.identity.name.clone(),
            x: self.position.x,
            y: self.position.y,
            target_x: self.target.x,
            target_y: self.target.y,
            color: self.identity.color.clone(),
            memory: self.memory.to_vec(),
            personality: self.identity.personality,
            goal: self.identity.goal,
            last_thought: self.last_thought.clone(),
            move_progress: self.progress,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn identity(id: u32, name: &str) -> AgentIdentity {
        AgentIdentity {
            id: AgentId(id),
            name: name.to_owned(),
            color: "blue".to_owned(),
            personality: Personality::Curious,
            goal: Goal::Explore,
        }
    }

    fn agent_at(x: i32, y: i32) -> Agent {
        Agent::new(identity(0, "Ava"), Position::new(x, y), 10)
    }

    #[test]
    fn new_agent_is_idle_with_empty_memory() {
        let agent = agent_at(200, 200);
        assert!(agent.is_idle());
        assert_eq!(agent.progress(), 1.0);
        assert!(agent.memory().is_empty());
        assert_eq!(agent.target(), agent.position());
    }

    #[test]
    fn idle_agent_prepares_a_move_and_records_it() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut agent = agent_at(250, 220);
        agent.queue_thought("I think I'll explore east for a while.".to_owned());
        agent.step(false, ActivityArea::default(), &AgentConfig::default(), &mut rng);

        assert_eq!(agent.last_thought(), "I think I'll explore east for a while.");
        assert!(agent.next_thought().is_none());
        assert_eq!(agent.progress(), 0.0);
        assert_eq!(agent.target().y, 220);
        assert!(agent.target().x > 250);
        let memory = agent.memory().to_vec();
        assert_eq!(memory.len(), 1);
        assert!(memory.first().unwrap().contains("Ava moved east to ("));
    }

    #[test]
    fn move_completes_in_five_ticks_at_target() {
        let mut rng = SmallRng::seed_from_u64(2);
        let config = AgentConfig::default();
        let area = ActivityArea::default();
        let mut agent = agent_at(250, 220);
        agent.queue_thought("south".to_owned());
        agent.step(false, area, &config, &mut rng);
        let target = agent.target();
        for _ in 0..5 {
            agent.step(false, area, &config, &mut rng);
            assert_eq!(
                agent.position(),
                interpolate(agent.last_position(), agent.target(), agent.progress())
            );
        }
        assert_eq!(agent.progress(), 1.0);
        assert_eq!(agent.position(), target);
    }

    #[test]
    fn queued_target_is_prefetched_near_completion() {
        let mut rng = SmallRng::seed_from_u64(3);
        let config = AgentConfig::default();
        let area = ActivityArea::default();
        let mut agent = agent_at(250, 220);
        agent.queue_thought("north".to_owned());
        agent.step(false, area, &config, &mut rng);
        agent.enqueue_target(Position::new(300, 280));

        for _ in 0..5 {
            agent.step(false, area, &config, &mut rng);
        }
        assert_eq!(agent.target(), Position::new(300, 280));
        assert_eq!(agent.queued_targets(), 0);
        assert!(agent.progress() < 1.0);
    }

    #[test]
    fn frozen_agent_does_not_move() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut agent = agent_at(250, 220);
        agent.set_conversation_cooldown(2);
        let wants = agent.step(true, ActivityArea::default(), &AgentConfig::default(), &mut rng);
        assert!(!wants);
        assert!(agent.is_idle());
        assert_eq!(agent.conversation_cooldown(), 2);
        assert!(agent.memory().is_empty());
    }

    #[test]
    fn disabled_agent_does_not_move() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut agent = agent_at(250, 220);
        agent.set_move_enabled(false);
        agent.step(false, ActivityArea::default(), &AgentConfig::default(), &mut rng);
        assert!(agent.is_idle());
    }

    #[test]
    fn certain_think_chance_flags_and_resets_cooldown() {
        let mut rng = SmallRng::seed_from_u64(5);
        let config = AgentConfig {
            think_chance: 1.0,
            think_cooldown: 4,
            ..AgentConfig::default()
        };
        let mut agent = agent_at(250, 220);
        assert!(agent.step(false, ActivityArea::default(), &config, &mut rng));
        assert_eq!(agent.thinking_cooldown(), 4);
    }

    #[test]
    fn conversation_cooldown_decrements_on_idle_ticks() {
        let mut rng = SmallRng::seed_from_u64(6);
        let config = AgentConfig {
            stay_jitter: 0,
            ..AgentConfig::default()
        };
        let mut agent = agent_at(250, 220);
        agent.queue_thought("stay".to_owned());
        agent.set_conversation_cooldown(2);
        agent.step(false, ActivityArea::default(), &config, &mut rng);
        agent.step(false, ActivityArea::default(), &config, &mut rng);
        agent.step(false, ActivityArea::default(), &config, &mut rng);
        assert_eq!(agent.conversation_cooldown(), -1);
    }

    #[test]
    fn staying_in_place_records_no_memory() {
        let mut rng = SmallRng::seed_from_u64(7);
        let config = AgentConfig {
            stay_jitter: 0,
            ..AgentConfig::default()
        };
        let mut agent = agent_at(250, 220);
        agent.queue_thought("I'll stay here.".to_owned());
        agent.step(false, ActivityArea::default(), &config, &mut rng);
        assert!(agent.is_idle());
        assert!(agent.memory().is_empty());
    }

    #[test]
    fn snapshot_reflects_state() {
        let agent = agent_at(210, 230);
        let snap = agent.snapshot();
        assert_eq!(snap.id, AgentId(0));
        assert_eq!((snap.x, snap.y), (210, 230));
        assert_eq!((snap.target_x, snap.target_y), (210, 230));
        assert_eq!(snap.move_progress, 1.0);
        assert!(snap.memory.is_empty());
    }
}
