//! Backend configuration loaded from the environment.
//!
//! The narrator needs to know which LLM API to call and how to reach it.
//! Leaving `NARRATOR_BACKEND` unset is not an error: the simulation then
//! narrates every effect with fallback text.

use std::time::Duration;

use crate::error::NarratorError;

/// Configuration for the LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key. Empty for local OpenAI-compatible servers.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// Google Gemini `generateContent` API.
    Gemini,
}

impl BackendType {
    /// Parse a backend name as written in `NARRATOR_BACKEND`.
    pub fn parse(name: &str) -> Result<Self, NarratorError> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(NarratorError::Config(format!("unknown backend type: {other}"))),
        }
    }

    /// Base URL used when `NARRATOR_API_URL` is unset.
    pub const fn default_api_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    const fn requires_key(self) -> bool {
        !matches!(self, Self::OpenAi)
    }
}

/// Everything the narrator reads at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarratorSettings {
    /// The backend, or `None` for fallback-only narration.
    pub backend: Option<LlmBackendConfig>,
    /// HTTP timeout for one request.
    pub request_timeout: Duration,
    /// Token budget for one narrative.
    pub max_tokens: u32,
    /// Directory with `system.j2` and `effect.j2` overriding the built-in
    /// prompt templates.
    pub templates_dir: Option<String>,
}

impl NarratorSettings {
    /// Load settings from environment variables.
    ///
    /// Variables:
    /// - `NARRATOR_BACKEND` -- `openai`, `anthropic`, or `gemini`; unset
    ///   disables the backend
    /// - `NARRATOR_API_URL` -- API base URL (per-backend default)
    /// - `NARRATOR_API_KEY` -- API key (optional for `openai`)
    /// - `NARRATOR_MODEL` -- model name (required with a backend)
    /// - `NARRATOR_TEMPLATES_DIR` -- prompt template override directory
    pub fn from_env(request_timeout: Duration, max_tokens: u32) -> Result<Self, NarratorError> {
        Self::from_lookup(|name| std::env::var(name).ok(), request_timeout, max_tokens)
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        request_timeout: Duration,
        max_tokens: u32,
    ) -> Result<Self, NarratorError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend = match non_empty("NARRATOR_BACKEND") {
            None => None,
            Some(name) => {
                let backend_type = BackendType::parse(&name)?;
                let api_url = non_empty("NARRATOR_API_URL")
                    .unwrap_or_else(|| backend_type.default_api_url().to_owned());
                let api_key = non_empty("NARRATOR_API_KEY").unwrap_or_default();
                if api_key.is_empty() && backend_type.requires_key() {
                    return Err(NarratorError::Config(format!(
                        "NARRATOR_API_KEY is required for the {name} backend"
                    )));
                }
                let model = non_empty("NARRATOR_MODEL").ok_or_else(|| {
                    NarratorError::Config("NARRATOR_MODEL is required with a backend".to_owned())
                })?;
                Some(LlmBackendConfig {
                    backend_type,
                    api_url: api_url.trim_end_matches('/').to_owned(),
                    api_key,
                    model,
                })
            }
        };

        Ok(Self {
            backend,
            request_timeout,
            max_tokens,
            templates_dir: non_empty("NARRATOR_TEMPLATES_DIR"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<NarratorSettings, NarratorError> {
        let map: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        NarratorSettings::from_lookup(|name| map.get(name).cloned(), Duration::from_secs(7), 120)
    }

    #[test]
    fn unset_backend_means_fallback_only() {
        let settings = load(&[]).unwrap_or_else(|e| panic!("{e}"));
        assert!(settings.backend.is_none());
        assert_eq!(settings.max_tokens, 120);
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!(BackendType::parse("Ollama").ok(), Some(BackendType::OpenAi));
        assert_eq!(BackendType::parse("claude").ok(), Some(BackendType::Anthropic));
        assert_eq!(BackendType::parse(" gemini ").ok(), Some(BackendType::Gemini));
        assert!(BackendType::parse("palm").is_err());
    }

    #[test]
    fn defaults_fill_in_url() {
        let settings = load(&[
            ("NARRATOR_BACKEND", "gemini"),
            ("NARRATOR_API_KEY", "k"),
            ("NARRATOR_MODEL", "m"),
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        let backend = settings.backend.unwrap_or_else(|| panic!("backend expected"));
        assert_eq!(backend.api_url, BackendType::Gemini.default_api_url());
    }

    #[test]
    fn local_openai_needs_no_key() {
        let settings = load(&[
            ("NARRATOR_BACKEND", "ollama"),
            ("NARRATOR_API_URL", "http://localhost:11434/v1/"),
            ("NARRATOR_MODEL", "llama3"),
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        let backend = settings.backend.unwrap_or_else(|| panic!("backend expected"));
        assert_eq!(backend.api_url, "http://localhost:11434/v1");
        assert!(backend.api_key.is_empty());
    }

    #[test]
    fn hosted_backends_need_key_and_model() {
        assert!(load(&[("NARRATOR_BACKEND", "anthropic"), ("NARRATOR_MODEL", "m")]).is_err());
        assert!(load(&[("NARRATOR_BACKEND", "anthropic"), ("NARRATOR_API_KEY", "k")]).is_err());
    }
}
