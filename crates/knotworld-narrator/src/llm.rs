//! LLM backend abstraction and implementations.
//!
//! Enum dispatch over three HTTP APIs: OpenAI-compatible chat completions,
//! the Anthropic Messages API, and Gemini `generateContent`. All backends
//! communicate over HTTP via `reqwest` and return plain response text.

use std::time::Duration;

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::NarratorError;
use crate::prompt::RenderedPrompt;

/// Sampling temperature for narratives.
const TEMPERATURE: f64 = 0.9;

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// An LLM backend that can process a prompt and return a response.
///
/// Uses enum dispatch instead of trait objects because async methods
/// are not dyn-compatible in Rust.
#[derive(Debug)]
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(HttpBackend),
    /// Anthropic Messages API.
    Anthropic(HttpBackend),
    /// Google Gemini API.
    Gemini(HttpBackend),
}

impl LlmBackend {
    /// Send a prompt to the LLM and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`NarratorError::LlmBackend`] if the HTTP call fails or the
    /// response cannot be extracted.
    pub async fn complete(
        &self,
        prompt: &RenderedPrompt,
        max_tokens: u32,
    ) -> Result<String, NarratorError> {
        match self {
            Self::OpenAi(http) => {
                let body = serde_json::json!({
                    "model": http.model,
                    "messages": [
                        {"role": "system", "content": prompt.system},
                        {"role": "user", "content": prompt.user}
                    ],
                    "temperature": TEMPERATURE,
                    "max_tokens": max_tokens
                });
                let url = format!("{}/chat/completions", http.api_url);
                let mut request = http.client.post(&url);
                if !http.api_key.is_empty() {
                    request = request.header("Authorization", format!("Bearer {}", http.api_key));
                }
                let json = http.send(self.name(), request, &body).await?;
                extract_openai_content(&json)
            }
            Self::Anthropic(http) => {
                let body = serde_json::json!({
                    "model": http.model,
                    "max_tokens": max_tokens,
                    "temperature": TEMPERATURE,
                    "system": prompt.system,
                    "messages": [
                        {"role": "user", "content": prompt.user}
                    ]
                });
                let url = format!("{}/messages", http.api_url);
                let request = http
                    .client
                    .post(&url)
                    .header("x-api-key", &http.api_key)
                    .header("anthropic-version", "2023-06-01");
                let json = http.send(self.name(), request, &body).await?;
                extract_anthropic_content(&json)
            }
            Self::Gemini(http) => {
                let body = serde_json::json!({
                    "systemInstruction": {"parts": [{"text": prompt.system}]},
                    "contents": [
                        {"role": "user", "parts": [{"text": prompt.user}]}
                    ],
                    "generationConfig": {
                        "temperature": TEMPERATURE,
                        "maxOutputTokens": max_tokens
                    }
                });
                let url = format!("{}/models/{}:generateContent", http.api_url, http.model);
                let request = http.client.post(&url).header("x-goog-api-key", &http.api_key);
                let json = http.send(self.name(), request, &body).await?;
                extract_gemini_content(&json)
            }
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
            Self::Gemini(_) => "gemini",
        }
    }

    /// Model identifier in use.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(http) | Self::Anthropic(http) | Self::Gemini(http) => &http.model,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared HTTP plumbing
// ---------------------------------------------------------------------------

/// Connection details shared by every backend.
#[derive(Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HttpBackend {
    /// Build a client with the given request timeout.
    pub fn new(config: &LlmBackendConfig, timeout: Duration) -> Result<Self, NarratorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NarratorError::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn send(
        &self,
        backend: &str,
        request: reqwest::RequestBuilder,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, NarratorError> {
        let response = request
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| NarratorError::LlmBackend(format!("{backend} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(NarratorError::LlmBackend(format!(
                "{backend} returned {status}: {error_body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| NarratorError::LlmBackend(format!("{backend} response parse failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Response extraction
// ---------------------------------------------------------------------------

fn missing(what: &str) -> NarratorError {
    NarratorError::LlmBackend(format!("response missing {what}"))
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, NarratorError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| missing("choices[0].message.content"))
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, NarratorError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| missing("content[0].text"))
}

/// Extract and join the text parts of the first Gemini candidate.
fn extract_gemini_content(json: &serde_json::Value) -> Result<String, NarratorError> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| missing("candidates[0].content.parts"))?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(serde_json::Value::as_str))
        .collect();
    if text.is_empty() {
        return Err(missing("candidates[0].content.parts[].text"));
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create an LLM backend from configuration.
pub fn create_backend(
    config: &LlmBackendConfig,
    timeout: Duration,
) -> Result<LlmBackend, NarratorError> {
    let http = HttpBackend::new(config, timeout)?;
    Ok(match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(http),
        BackendType::Anthropic => LlmBackend::Anthropic(http),
        BackendType::Gemini => LlmBackend::Gemini(http),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "The ore veins hum."}}]
        });
        assert_eq!(
            extract_openai_content(&json).unwrap_or_default(),
            "The ore veins hum."
        );
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(extract_openai_content(&json).is_err());
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({
            "content": [{"type": "text", "text": "Light pools in the meadow."}]
        });
        assert_eq!(
            extract_anthropic_content(&json).unwrap_or_default(),
            "Light pools in the meadow."
        );
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn extract_gemini_joins_parts() {
        let json = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "The air "}, {"text": "thickens."}]}}]
        });
        assert_eq!(
            extract_gemini_content(&json).unwrap_or_default(),
            "The air thickens."
        );
        assert!(extract_gemini_content(&serde_json::json!({"candidates": []})).is_err());
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        let cases = [
            (BackendType::OpenAi, "openai-compatible"),
            (BackendType::Anthropic, "anthropic"),
            (BackendType::Gemini, "gemini"),
        ];
        for (backend_type, name) in cases {
            let config = LlmBackendConfig {
                backend_type,
                api_url: backend_type.default_api_url().to_owned(),
                api_key: "test".to_owned(),
                model: "test-model".to_owned(),
            };
            let backend = create_backend(&config, Duration::from_secs(1))
                .unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(backend.name(), name);
            assert_eq!(backend.model(), "test-model");
        }
    }
}
