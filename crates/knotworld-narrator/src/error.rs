//! Error types for the narrator.
//!
//! Uses `thiserror` for typed errors covering backend configuration, prompt
//! rendering, and the LLM call itself. None of them reach the tick: the
//! simulation substitutes fallback text for any failure.

use knotworld_core::NarrativeError;

/// Errors that can occur while producing a narrative.
#[derive(Debug, thiserror::Error)]
pub enum NarratorError {
    /// Configuration is invalid or incomplete.
    #[error("config error: {0}")]
    Config(String),

    /// Failed to load or render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The backend answered with nothing usable.
    #[error("empty narrative from {0}")]
    Empty(&'static str),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<NarratorError> for NarrativeError {
    fn from(err: NarratorError) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }
}
