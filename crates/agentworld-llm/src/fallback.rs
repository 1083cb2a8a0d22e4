//! Deterministic template fallbacks.
//!
//! When a backend is absent, slow, or failing, dispatchers call
//! [`select_fallback`] instead. The template is picked from the request's
//! fingerprint, so the same scenario always degrades to the same text.

use agentworld_types::{Direction, Personality};

use crate::prompt::{DialoguePrompt, ThoughtPrompt};

/// What needs a fallback.
#[derive(Debug, Clone, Copy)]
pub enum FallbackRequest<'a> {
    /// A single agent's next thought.
    Thought(&'a ThoughtPrompt),
    /// A conversation between two agents.
    Dialogue(&'a DialoguePrompt),
}

const MOVE_DIRECTIONS: [Direction; 4] = [
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
];

/// Thought templates per personality; `{dir}` is replaced by a direction.
fn thought_templates(personality: Personality) -> &'static [&'static str] {
    match personality {
        Personality::Curious => &[
            "I think I'll explore {dir} for a while.",
            "I wonder what lies to the {dir}. Let me look.",
            "Something to the {dir} caught my eye.",
        ],
        Personality::Analytical => &[
            "The {dir} side looks least explored. Heading {dir}.",
            "Let me try going {dir} to see what happens.",
            "Moving {dir} is the logical next step.",
        ],
        Personality::Social => &[
            "Maybe someone is around to the {dir}. I'll head {dir}.",
            "I'll go {dir} and see who I meet.",
            "Moving {dir} feels right for making friends.",
        ],
        Personality::Independent => &[
            "I'll make my own way {dir}.",
            "Moving {dir} feels right for my goals.",
            "Nobody told me to go {dir}, so I will.",
        ],
        Personality::Creative => &[
            "The light to the {dir} looks inspiring. Off I go.",
            "Let me wander {dir} and imagine what could be there.",
            "I think I'll explore {dir} for a while.",
        ],
    }
}

/// Pick a fallback text for `request` using `seed` (normally the request's
/// cache fingerprint).
///
/// Thought fallbacks always contain a movement direction word, so the agent
/// acting on them moves deliberately.
pub fn select_fallback(request: FallbackRequest<'_>, seed: u64) -> String {
    match request {
        FallbackRequest::Thought(ctx) => {
            let templates = thought_templates(ctx.personality);
            let template = pick(templates, seed).unwrap_or("I think I'll explore {dir} for a while.");
            let direction = pick(&MOVE_DIRECTIONS, seed.rotate_right(17)).unwrap_or(Direction::North);
            template.replace("{dir}", direction.as_str())
        }
        FallbackRequest::Dialogue(ctx) => fallback_dialogue(ctx, seed),
    }
}

fn fallback_dialogue(ctx: &DialoguePrompt, seed: u64) -> String {
    let a = &ctx.initiator;
    let b = &ctx.partner;
    let (a_name, b_name) = (a.name.as_str(), b.name.as_str());
    let a_goal = a.goal.as_str().to_lowercase();
    let b_goal = b.goal.as_str().to_lowercase();
    let a_personality = a.personality.as_str().to_lowercase();

    match seed.checked_rem(3).unwrap_or(0) {
        0 => format!(
            "{a_name}: Hi {b_name}, how's your exploration going?\n\
             {b_name}: Good! I'm focused on my goal to {b_goal}.\n\
             {a_name}: That's interesting! As a {a_personality} type, I'm more into {a_goal}.\n\
             {b_name}: We should collaborate sometime!"
        ),
        1 => format!(
            "{a_name}: Hello there, {b_name}! I've been wandering around looking for ways to {a_goal}.\n\
             {b_name}: What a coincidence! I'm trying to {b_goal} myself.\n\
             {a_name}: Perhaps we could work together?\n\
             {b_name}: That sounds like a good idea!"
        ),
        _ => format!(
            "{a_name}: Oh, hello! I didn't expect to run into someone here.\n\
             {b_name}: Same here! I'm {b_name}, and I'm on a mission to {b_goal}.\n\
             {a_name}: I'm {a_name}. Being {a_personality}, I find that fascinating.\n\
             {b_name}: Thanks! I hope our paths cross again soon."
        ),
    }
}

fn pick<T: Copy>(items: &[T], seed: u64) -> Option<T> {
    let len = u64::try_from(items.len()).ok()?;
    let index = usize::try_from(seed.checked_rem(len)?).ok()?;
    items.get(index).copied()
}
