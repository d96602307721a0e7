//! LLM-backed narrative source for Knotworld SQK effects.
//!
//! When the simulation commits an SQK effect it asks a
//! [`NarrativeSource`](knotworld_core::NarrativeSource) for flavor text.
//! This crate provides one that renders a `minijinja` prompt and calls an
//! OpenAI-compatible, Anthropic, or Gemini endpoint over `reqwest`.
//!
//! # Architecture
//!
//! ```text
//! NarrativeRequest --> PromptEngine --> LlmBackend --> clean_narrative --> text
//! ```
//!
//! Any failure surfaces as a [`NarrativeError`](knotworld_core::NarrativeError)
//! and the simulation falls back to `"Event: <kind>"`.

pub mod config;
pub mod error;
pub mod llm;
pub mod narrator;
pub mod prompt;

pub use config::{BackendType, LlmBackendConfig, NarratorSettings};
pub use error::NarratorError;
pub use llm::{LlmBackend, create_backend};
pub use narrator::{LlmNarrator, Narrator, clean_narrative};
pub use prompt::{PromptEngine, RenderedPrompt};
