//! Prompt template loading and rendering via `minijinja`.
//!
//! Two templates drive every request: `system.j2` sets the narrator's voice
//! and `effect.j2` describes the planned effect. Built-in copies are
//! compiled in; [`PromptEngine::from_dir`] loads replacements from disk so
//! operators can tune the voice without recompiling.

use knotworld_core::NarrativeRequest;
use knotworld_types::{EffectDetails, SpeedTarget};
use minijinja::Environment;
use serde::Serialize;

use crate::error::NarratorError;

const BUILTIN_SYSTEM: &str = include_str!("../templates/system.j2");
const BUILTIN_EFFECT: &str = include_str!("../templates/effect.j2");

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl core::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PromptEngine").finish_non_exhaustive()
    }
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message establishing the narrator's voice.
    pub system: String,
    /// User message describing the effect.
    pub user: String,
}

/// Flattened view of a request handed to the templates.
#[derive(Debug, Serialize)]
struct EffectContext {
    kind: &'static str,
    duration: u32,
    knot_tick: u64,
    projected_res: String,
    boosted_cells: usize,
    target: String,
    multiplier: String,
}

impl EffectContext {
    fn from_request(request: &NarrativeRequest) -> Self {
        let mut ctx = Self {
            kind: request.kind.as_str(),
            duration: request.duration,
            knot_tick: request.knot_tick,
            projected_res: format!("{:.2}", request.projected_res),
            boosted_cells: 0,
            target: String::new(),
            multiplier: String::new(),
        };
        match &request.details {
            EffectDetails::ResourceBoost { boosted_cells } => {
                ctx.boosted_cells = boosted_cells.len();
            }
            EffectDetails::AgentSpeedBoost { target, multiplier } => {
                ctx.target = match target {
                    SpeedTarget::All => "all".to_owned(),
                    SpeedTarget::Agent(id) => id.to_string(),
                };
                ctx.multiplier = format!("{multiplier:.1}");
            }
            EffectDetails::GoalReveal => {}
        }
        ctx
    }
}

impl PromptEngine {
    /// Create a prompt engine with the built-in templates.
    pub fn builtin() -> Result<Self, NarratorError> {
        Self::from_sources(BUILTIN_SYSTEM.to_owned(), BUILTIN_EFFECT.to_owned())
    }

    /// Create a prompt engine loading templates from the given directory.
    ///
    /// The directory must contain `system.j2` and `effect.j2`.
    pub fn from_dir(templates_dir: &str) -> Result<Self, NarratorError> {
        let system = load_template(templates_dir, "system.j2")?;
        let effect = load_template(templates_dir, "effect.j2")?;
        Self::from_sources(system, effect)
    }

    fn from_sources(system: String, effect: String) -> Result<Self, NarratorError> {
        let mut env = Environment::new();
        env.add_template_owned("system", system)
            .map_err(|e| NarratorError::Template(format!("failed to add system template: {e}")))?;
        env.add_template_owned("effect", effect)
            .map_err(|e| NarratorError::Template(format!("failed to add effect template: {e}")))?;
        Ok(Self { env })
    }

    /// Render the prompt for one planned effect.
    pub fn render(&self, request: &NarrativeRequest) -> Result<RenderedPrompt, NarratorError> {
        let ctx = EffectContext::from_request(request);
        let system = self.render_one("system", &ctx)?;
        let user = self.render_one("effect", &ctx)?;
        Ok(RenderedPrompt {
            system: system.trim().to_owned(),
            user: user.trim().to_owned(),
        })
    }

    fn render_one(&self, name: &str, ctx: &EffectContext) -> Result<String, NarratorError> {
        self.env
            .get_template(name)
            .map_err(|e| NarratorError::Template(format!("missing {name} template: {e}")))?
            .render(ctx)
            .map_err(|e| NarratorError::Template(format!("{name} render failed: {e}")))
    }
}

/// Read a template file from disk.
fn load_template(dir: &str, filename: &str) -> Result<String, NarratorError> {
    let path = format!("{dir}/{filename}");
    std::fs::read_to_string(&path)
        .map_err(|e| NarratorError::Template(format!("failed to read {path}: {e}")))
}

#[cfg(test)]
mod tests {
    use knotworld_types::{AgentId, Coord, EffectKind};

    use super::*;

    fn request(details: EffectDetails) -> NarrativeRequest {
        NarrativeRequest {
            kind: details.kind(),
            details,
            duration: 25,
            knot_tick: 812,
            projected_res: 0.4567,
        }
    }

    fn engine() -> PromptEngine {
        PromptEngine::builtin().unwrap_or_else(|e| panic!("builtin templates: {e}"))
    }

    #[test]
    fn resource_boost_prompt_counts_cells() {
        let prompt = engine()
            .render(&request(EffectDetails::ResourceBoost {
                boosted_cells: vec![Coord::new(1, 1), Coord::new(2, 3), Coord::new(4, 0)],
            }))
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(prompt.system.contains("Knotworld"));
        assert!(prompt.user.contains("moment 812"));
        assert!(prompt.user.contains("resonance 0.46"));
        assert!(prompt.user.contains("3 patches"));
        assert!(prompt.user.contains("lasts 25 moments"));
    }

    #[test]
    fn speed_boost_prompt_names_target() {
        let e = engine();
        let single = e
            .render(&request(EffectDetails::AgentSpeedBoost {
                target: SpeedTarget::Agent(AgentId::new(1)),
                multiplier: 1.5,
            }))
            .unwrap_or_else(|err| panic!("{err}"));
        assert!(single.user.contains("Agent 1"));
        assert!(single.user.contains("1.5 times"));

        let all = e
            .render(&request(EffectDetails::AgentSpeedBoost {
                target: SpeedTarget::All,
                multiplier: 1.3,
            }))
            .unwrap_or_else(|err| panic!("{err}"));
        assert!(all.user.contains("Every agent"));
    }

    #[test]
    fn goal_reveal_prompt() {
        let prompt = engine()
            .render(&request(EffectDetails::GoalReveal))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(request(EffectDetails::GoalReveal).kind, EffectKind::GoalReveal);
        assert!(prompt.user.contains("purpose"));
    }

    #[test]
    fn templates_load_from_disk() {
        let unique = format!(
            "knotworld_test_templates_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        std::fs::write(dir.join("system.j2"), "Be brief.").ok();
        std::fs::write(dir.join("effect.j2"), "{{ kind }} for {{ duration }}").ok();

        let engine = PromptEngine::from_dir(dir.to_str().unwrap_or(""))
            .unwrap_or_else(|e| panic!("{e}"));
        let prompt = engine
            .render(&request(EffectDetails::GoalReveal))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(prompt.system, "Be brief.");
        assert_eq!(prompt.user, "goal_reveal for 25");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_template_returns_error() {
        let dir = std::env::temp_dir().join(format!(
            "knotworld_missing_templates_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).ok();
        std::fs::write(dir.join("system.j2"), "only one").ok();
        assert!(PromptEngine::from_dir(dir.to_str().unwrap_or("")).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
