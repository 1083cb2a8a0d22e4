//! Prompt rendering via `minijinja`.
//!
//! Two templates are built in: `thought` (one agent deciding where to go)
//! and `dialogue` (two agents meeting). Either can be replaced by dropping a
//! `thought.j2` or `dialogue.j2` file into the configured templates
//! directory, so operators can tune the voice of the world without
//! recompiling.

use std::path::Path;

use agentworld_types::{Goal, NearbyAgent, Personality, Position};
use minijinja::Environment;
use serde::Serialize;

use crate::error::GenerationError;

const THOUGHT_SYSTEM: &str = "You are an autonomous agent in a small two-dimensional world. \
Answer with a single short first-person sentence about what you will do next, \
naming one direction: north, south, east, west, or stay.";

const DIALOGUE_SYSTEM: &str = "You write very short conversations between two agents \
in a small two-dimensional world. Use one line per turn, formatted as \"Name: words\".";

const THOUGHT_TEMPLATE: &str = "\
You are {{ name }}. Personality: {{ personality }}. Goal: {{ goal }}.
You are standing at ({{ position.x }}, {{ position.y }}).
{% if memory %}
Recent memories:
{% for m in memory %}
- {{ m }}
{% endfor %}
{% endif %}
{% if nearby %}
Nearby agents:
{% for n in nearby %}
- {{ n.name }} ({{ n.personality | lower }}), about {{ n.distance }} units away
{% endfor %}
{% else %}
No one is nearby.
{% endif %}
What do you do next?";

const DIALOGUE_TEMPLATE: &str = "\
Brief chat: {{ initiator.name }} ({{ initiator.personality | lower }}, wants to {{ initiator.goal | lower }}) \
meets {{ partner.name }} ({{ partner.personality | lower }}, wants to {{ partner.goal | lower }}) \
at ({{ initiator.position.x }}, {{ initiator.position.y }}).
Generate 2-3 short exchanges.";

/// The complete rendered prompt ready to send to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message framing the task.
    pub system: String,
    /// User message carrying the scenario.
    pub user: String,
}

/// Everything a thought prompt (and its fallback) may mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThoughtPrompt {
    /// Thinking agent's name.
    pub name: String,
    /// Thinking agent's personality.
    pub personality: Personality,
    /// Thinking agent's goal.
    pub goal: Goal,
    /// Where the agent stands.
    pub position: Position,
    /// A few recent memories, oldest first.
    pub memory: Vec<String>,
    /// Nearest neighbors within perception range.
    pub nearby: Vec<NearbyAgent>,
}

/// One side of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    /// Display name.
    pub name: String,
    /// Personality tag.
    pub personality: Personality,
    /// Goal tag.
    pub goal: Goal,
    /// Current position.
    pub position: Position,
}

/// Everything a dialogue prompt (and its fallback) may mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialoguePrompt {
    /// The agent that started the conversation.
    pub initiator: Participant,
    /// The other agent.
    pub partner: Participant,
}

/// Holds the `thought` and `dialogue` templates.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl std::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEngine").finish_non_exhaustive()
    }
}

impl PromptEngine {
    /// Engine with only the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Template`] if a built-in template fails to
    /// compile.
    pub fn builtin() -> Result<Self, GenerationError> {
        Self::new(None)
    }

    /// Engine with built-in templates, replaced by `thought.j2` and
    /// `dialogue.j2` from `templates_dir` where those files exist.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Template`] if an override cannot be read
    /// or any template fails to compile.
    pub fn new(templates_dir: Option<&Path>) -> Result<Self, GenerationError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        for (name, builtin) in [("thought", THOUGHT_TEMPLATE), ("dialogue", DIALOGUE_TEMPLATE)] {
            let source = match templates_dir {
                Some(dir) => load_override(dir, name)?.unwrap_or_else(|| builtin.to_owned()),
                None => builtin.to_owned(),
            };
            env.add_template_owned(name, source).map_err(|e| {
                GenerationError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Render the prompt for one agent's next thought.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Template`] if rendering fails.
    pub fn render_thought(&self, ctx: &ThoughtPrompt) -> Result<RenderedPrompt, GenerationError> {
        Ok(RenderedPrompt {
            system: THOUGHT_SYSTEM.to_owned(),
            user: self.render("thought", ctx)?,
        })
    }

    /// Render the prompt for a conversation between two agents.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Template`] if rendering fails.
    pub fn render_dialogue(&self, ctx: &DialoguePrompt) -> Result<RenderedPrompt, GenerationError> {
        Ok(RenderedPrompt {
            system: DIALOGUE_SYSTEM.to_owned(),
            user: self.render("dialogue", ctx)?,
        })
    }

    fn render<S: Serialize>(&self, name: &str, ctx: &S) -> Result<String, GenerationError> {
        let rendered = self
            .env
            .get_template(name)
            .map_err(|e| GenerationError::Template(format!("missing {name} template: {e}")))?
            .render(ctx)
            .map_err(|e| GenerationError::Template(format!("{name} render failed: {e}")))?;
        Ok(rendered.trim().to_owned())
    }
}

/// Read `<dir>/<name>.j2` if it exists.
fn load_override(dir: &Path, name: &str) -> Result<Option<String>, GenerationError> {
    let path = dir.join(format!("{name}.j2"));
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(&path)
        .map(Some)
        .map_err(|e| GenerationError::Template(format!("failed to read {}: {e}", path.display())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn participant(name: &str, x: i32) -> Participant {
        Participant {
            name: name.to_owned(),
            personality: Personality::Analytical,
            goal: Goal::Settle,
            position: Position::new(x, 200),
        }
    }

    fn thought() -> ThoughtPrompt {
        ThoughtPrompt {
            name: "Luna".to_owned(),
            personality: Personality::Curious,
            goal: Goal::Explore,
            position: Position::new(210, 180),
            memory: vec!["[10:00:00] Luna moved east to (210, 180)".to_owned()],
            nearby: vec![NearbyAgent {
                name: "Neo".to_owned(),
                distance: 20,
                personality: Personality::Social,
            }],
        }
    }

    #[test]
    fn thought_prompt_mentions_identity_memory_and_neighbors() {
        let engine = PromptEngine::builtin().unwrap();
        let prompt = engine.render_thought(&thought()).unwrap();
        assert!(prompt.user.starts_with("You are Luna."));
        assert!(prompt.user.contains("Curious and explorative"));
        assert!(prompt.user.contains("(210, 180)"));
        assert!(prompt.user.contains("Luna moved east"));
        assert!(prompt.user.contains("Neo (social and friendly), about 20 units away"));
        assert!(prompt.system.contains("north"));
    }

    #[test]
    fn lonely_thought_prompt_says_so() {
        let engine = PromptEngine::builtin().unwrap();
        let mut ctx = thought();
        ctx.nearby.clear();
        let prompt = engine.render_thought(&ctx).unwrap();
        assert!(prompt.user.contains("No one is nearby."));
    }

    #[test]
    fn dialogue_prompt_names_both_agents() {
        let engine = PromptEngine::builtin().unwrap();
        let prompt = engine
            .render_dialogue(&DialoguePrompt {
                initiator: participant("Ava", 200),
                partner: participant("Orion", 210),
            })
            .unwrap();
        assert!(prompt.user.starts_with("Brief chat: Ava"));
        assert!(prompt.user.contains("meets Orion"));
        assert!(prompt.user.contains("find an optimal location to settle"));
        assert!(prompt.user.contains("at (200, 200)"));
    }

    #[test]
    fn override_file_replaces_builtin() {
        let unique = format!(
            "agentworld_test_templates_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        std::fs::write(dir.join("thought.j2"), "{{ name }} ponders.").ok();

        let engine = PromptEngine::new(Some(&dir)).unwrap();
        let prompt = engine.render_thought(&thought()).unwrap();
        assert_eq!(prompt.user, "Luna ponders.");

        // dialogue.j2 is absent, so the built-in is still used
        let dialogue = engine
            .render_dialogue(&DialoguePrompt {
                initiator: participant("Ava", 200),
                partner: participant("Neo", 205),
            })
            .unwrap();
        assert!(dialogue.user.starts_with("Brief chat:"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn broken_override_is_a_template_error() {
        let unique = format!(
            "agentworld_bad_templates_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        std::fs::write(dir.join("dialogue.j2"), "{% if %}").ok();

        let result = PromptEngine::new(Some(&dir));
        assert!(matches!(result, Err(GenerationError::Template(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
