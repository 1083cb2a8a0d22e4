//! Multi-tick properties of the world: exclusivity of conversation pairs,
//! cooldown behaviour, and the memory bound.
//!
//! Interaction probabilities are raised to 1.0 and agents are packed into a
//! tiny activity area so that pairs form on nearly every tick.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::collections::BTreeSet;

use agentworld_agents::{ActivityArea, AgentConfig, World, WorldConfig};
use agentworld_types::AgentId;
use chrono::Utc;

fn crowded_world(seed: u64, agents: usize) -> World {
    let settings = WorldConfig {
        seed: Some(seed),
        activity_area: ActivityArea {
            min_x: 240,
            min_y: 240,
            max_x: 260,
            max_y: 260,
        },
        ..WorldConfig::default()
    };
    let config = AgentConfig {
        interaction_check_chance: 1.0,
        conversation_chance: 1.0,
        think_chance: 0.5,
        ..AgentConfig::default()
    };
    let mut world = World::new(settings, config).unwrap();
    world.reset(agents).unwrap();
    world
}

#[test]
fn pending_pairs_never_repeat_an_agent() {
    let mut world = crowded_world(11, 9);
    for tick in 0..200 {
        world.step(Utc::now());
        // Release on alternate ticks so pending and in-flight pairs overlap.
        let pairs = world.drain_conversations(if tick % 2 == 0 { 1 } else { 0 });
        let mut seen = BTreeSet::new();
        for agent in world.agents() {
            if world.conversations().contains(agent.id()) {
                seen.insert(agent.id());
            }
        }
        let active = world.conversations().pending_len() + world.conversations().in_flight_len();
        assert_eq!(seen.len(), active * 2, "tick {tick}: an agent appears twice");
        for pair in &pairs {
            world.release_conversation(pair);
        }
    }
}

#[test]
fn registered_agents_cool_down_before_pairing_again() {
    let mut world = crowded_world(12, 4);
    let mut last_paired: Vec<Option<usize>> = vec![None; 4];
    for tick in 0..150 {
        world.step(Utc::now());
        let pairs = world.drain_conversations(0);
        for pair in &pairs {
            for id in [pair.initiator, pair.partner] {
                let agent = world.agent(id).unwrap();
                assert!(agent.conversation_cooldown() > 0);
                let slot = usize::try_from(id.get()).unwrap();
                if let Some(previous) = last_paired[slot] {
                    // Cooldown of 2 is consumed by idle ticks, so at least
                    // two ticks separate consecutive pairings.
                    assert!(tick - previous >= 2, "agent {id} re-paired too early");
                }
                last_paired[slot] = Some(tick);
            }
            world.release_conversation(pair);
        }
    }
}

#[test]
fn memory_bound_holds_over_long_runs() {
    let mut world = crowded_world(13, 6);
    for _ in 0..500 {
        world.step(Utc::now());
        for pair in world.drain_conversations(0) {
            world.release_conversation(&pair);
        }
        for id in world.drain_thinkers() {
            if let Some(agent) = world.agent_mut(id) {
                agent.queue_thought("I think I'll explore north for a while.".to_owned());
            }
        }
    }
    for agent in world.agents() {
        assert!(agent.memory().len() <= 10);
    }
    assert_eq!(world.len(), 6);
    assert!(world.agent(AgentId(5)).is_some());
}
