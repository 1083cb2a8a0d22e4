//! Deterministic cache keys for generation requests.
//!
//! A fingerprint keeps only what changes the answer: identity, a coarse
//! position cell, the bucketed neighborhood, and a time window. Two
//! requests that agree on all of these share a cached reply.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use agentworld_llm::{DialoguePrompt, Participant, ThoughtPrompt};
use agentworld_types::Position;
use chrono::{DateTime, Utc};

/// Index of the `window_secs`-wide window containing `now`.
pub fn time_bucket(now: DateTime<Utc>, window_secs: u64) -> i64 {
    let window = i64::try_from(window_secs).unwrap_or(i64::MAX).max(1);
    now.timestamp().checked_div_euclid(window).unwrap_or(0)
}

/// Grid cell of `position` for cells of `size` pixels.
pub fn position_bucket(position: Position, size: i32) -> (i32, i32) {
    let size = size.max(1);
    (
        position.x.checked_div_euclid(size).unwrap_or(0),
        position.y.checked_div_euclid(size).unwrap_or(0),
    )
}

/// Key for a thought request.
///
/// Memory is deliberately left out: it changes every move and would make
/// every request unique.
pub fn thought_fingerprint(prompt: &ThoughtPrompt, position_cell: i32, time_bucket: i64) -> u64 {
    let mut hasher = DefaultHasher::new();
    "thought".hash(&mut hasher);
    prompt.name.hash(&mut hasher);
    prompt.personality.hash(&mut hasher);
    position_bucket(prompt.position, position_cell).hash(&mut hasher);
    neighborhood_hash(&prompt.nearby).hash(&mut hasher);
    time_bucket.hash(&mut hasher);
    hasher.finish()
}

/// Key for a dialogue request; the same for either speaking order.
pub fn dialogue_fingerprint(prompt: &DialoguePrompt, time_bucket: i64) -> u64 {
    let a = participant_hash(&prompt.initiator);
    let b = participant_hash(&prompt.partner);
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = DefaultHasher::new();
    "dialogue".hash(&mut hasher);
    low.hash(&mut hasher);
    high.hash(&mut hasher);
    time_bucket.hash(&mut hasher);
    hasher.finish()
}

fn neighborhood_hash<T: Hash>(nearby: &[T]) -> u64 {
    let mut hasher = DefaultHasher::new();
    nearby.hash(&mut hasher);
    hasher.finish()
}

fn participant_hash(p: &Participant) -> u64 {
    let mut hasher = DefaultHasher::new();
    p.name.hash(&mut hasher);
    p.personality.hash(&mut hasher);
    p.goal.hash(&mut hasher);
    hasher.finish()
}
