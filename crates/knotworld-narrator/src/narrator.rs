//! The [`NarrativeSource`] implementation handed to the simulation.

use std::future::Future;

use knotworld_core::{NarrativeError, NarrativeRequest, NarrativeSource};
use tracing::{debug, info};

use crate::config::NarratorSettings;
use crate::error::NarratorError;
use crate::llm::{LlmBackend, create_backend};
use crate::prompt::PromptEngine;

/// Longest narrative kept, in characters.
pub const MAX_NARRATIVE_CHARS: usize = 320;

/// Prompt plus backend.
#[derive(Debug)]
pub struct LlmNarrator {
    backend: LlmBackend,
    prompts: PromptEngine,
    max_tokens: u32,
}

impl LlmNarrator {
    /// Wrap a backend and prompt engine.
    pub const fn new(backend: LlmBackend, prompts: PromptEngine, max_tokens: u32) -> Self {
        Self {
            backend,
            prompts,
            max_tokens,
        }
    }

    /// Render, call the backend, and clean up the answer.
    pub async fn narrate_effect(&self, request: &NarrativeRequest) -> Result<String, NarratorError> {
        let prompt = self.prompts.render(request)?;
        let raw = self.backend.complete(&prompt, self.max_tokens).await?;
        let text = clean_narrative(&raw).ok_or(NarratorError::Empty(self.backend.name()))?;
        debug!(kind = %request.kind, backend = self.backend.name(), chars = text.len(), "narrative received");
        Ok(text)
    }
}

/// Either a live LLM narrator or fallback-only narration.
#[derive(Debug)]
pub enum Narrator {
    /// Calls an LLM backend.
    Llm(LlmNarrator),
    /// No backend configured. Every request reports
    /// [`NarrativeError::Unavailable`].
    Disabled,
}

impl Narrator {
    /// Build a narrator from loaded settings.
    ///
    /// Returns [`Narrator::Disabled`] when no backend is configured.
    pub fn from_settings(settings: &NarratorSettings) -> Result<Self, NarratorError> {
        let Some(config) = settings.backend.as_ref() else {
            info!("no narrator backend configured, using fallback narratives");
            return Ok(Self::Disabled);
        };
        let prompts = match settings.templates_dir.as_deref() {
            Some(dir) => PromptEngine::from_dir(dir)?,
            None => PromptEngine::builtin()?,
        };
        let backend = create_backend(config, settings.request_timeout)?;
        info!(
            backend = backend.name(),
            model = backend.model(),
            timeout_ms = u64::try_from(settings.request_timeout.as_millis()).unwrap_or(u64::MAX),
            "narrator backend configured"
        );
        Ok(Self::Llm(LlmNarrator::new(backend, prompts, settings.max_tokens)))
    }

    /// Whether a backend is configured.
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Llm(_))
    }
}

impl NarrativeSource for Narrator {
    fn narrate(
        &self,
        request: &NarrativeRequest,
    ) -> impl Future<Output = Result<String, NarrativeError>> + Send {
        async move {
            match self {
                Self::Llm(narrator) => narrator.narrate_effect(request).await.map_err(Into::into),
                Self::Disabled => Err(NarrativeError::Unavailable),
            }
        }
    }
}

/// Normalize model output into a single short paragraph.
///
/// Strips wrapping quotes, collapses whitespace, and truncates at
/// [`MAX_NARRATIVE_CHARS`]. Returns `None` if nothing is left.
pub fn clean_narrative(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed
        .trim_matches(|c: char| c == '"' || c == '\u{201c}' || c == '\u{201d}')
        .trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() <= MAX_NARRATIVE_CHARS {
        return Some(trimmed.to_owned());
    }
    let cut: String = trimmed.chars().take(MAX_NARRATIVE_CHARS).collect();
    let end = cut.rfind(' ').unwrap_or(cut.len());
    let head = cut.get(..end).unwrap_or(&cut).trim_end();
    Some(format!("{head}..."))
}
