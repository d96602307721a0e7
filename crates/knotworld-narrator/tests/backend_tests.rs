//! Integration tests for the narrator against local mock LLM endpoints.
//!
//! Each test serves a tiny Axum app on an ephemeral port that mimics one
//! provider's wire format, then drives [`Narrator`] through the
//! [`NarrativeSource`] trait exactly as the simulation does.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc, clippy::indexing_slicing)]

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use knotworld_core::narrative::narrate_with_fallback;
use knotworld_core::{NarrativeRequest, NarrativeSource};
use knotworld_narrator::{BackendType, LlmBackendConfig, Narrator, NarratorSettings};
use knotworld_types::{Coord, EffectDetails};

// =============================================================================
// Helpers
// =============================================================================

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

fn narrator(backend_type: BackendType, api_url: String) -> Narrator {
    let settings = NarratorSettings {
        backend: Some(LlmBackendConfig {
            backend_type,
            api_url,
            api_key: "test-key".to_owned(),
            model: "test-model".to_owned(),
        }),
        request_timeout: Duration::from_secs(5),
        max_tokens: 64,
        templates_dir: None,
    };
    Narrator::from_settings(&settings).unwrap()
}

fn boost_request() -> NarrativeRequest {
    let details = EffectDetails::ResourceBoost {
        boosted_cells: vec![Coord::new(2, 2), Coord::new(3, 7)],
    };
    NarrativeRequest {
        kind: details.kind(),
        details,
        duration: 30,
        knot_tick: 144,
        projected_res: 0.47,
    }
}

// =============================================================================
// Providers
// =============================================================================

#[tokio::test]
async fn openai_compatible_round_trip() {
    let app = Router::new().route(
        "/chat/completions",
        post(|headers: HeaderMap, body: axum::Json<serde_json::Value>| async move {
            assert_eq!(
                headers.get("authorization").and_then(|v| v.to_str().ok()),
                Some("Bearer test-key")
            );
            assert_eq!(body.0["model"], "test-model");
            assert_eq!(body.0["max_tokens"], 64);
            let user = body.0["messages"][1]["content"].as_str().unwrap_or_default();
            assert!(user.contains("2 patches"));
            axum::Json(serde_json::json!({
                "choices": [{"message": {"content": "  \"Two patches of ore begin to glow.\" "}}]
            }))
        }),
    );
    let url = serve(app).await;
    let text = narrator(BackendType::OpenAi, url)
        .narrate(&boost_request())
        .await
        .unwrap();
    assert_eq!(text, "Two patches of ore begin to glow.");
}

#[tokio::test]
async fn anthropic_round_trip() {
    let app = Router::new().route(
        "/messages",
        post(|headers: HeaderMap, body: axum::Json<serde_json::Value>| async move {
            assert_eq!(
                headers.get("x-api-key").and_then(|v| v.to_str().ok()),
                Some("test-key")
            );
            assert!(body.0["system"].as_str().unwrap_or_default().contains("Knotworld"));
            axum::Json(serde_json::json!({
                "content": [{"type": "text", "text": "The meadow brightens."}]
            }))
        }),
    );
    let url = serve(app).await;
    let text = narrator(BackendType::Anthropic, url)
        .narrate(&boost_request())
        .await
        .unwrap();
    assert_eq!(text, "The meadow brightens.");
}

#[tokio::test]
async fn gemini_round_trip() {
    let app = Router::new().route(
        "/models/test-model:generateContent",
        post(|headers: HeaderMap| async move {
            assert_eq!(
                headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()),
                Some("test-key")
            );
            axum::Json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "Water remembers the sky."}]}}]
            }))
        }),
    );
    let url = serve(app).await;
    let text = narrator(BackendType::Gemini, url)
        .narrate(&boost_request())
        .await
        .unwrap();
    assert_eq!(text, "Water remembers the sky.");
}

// =============================================================================
// Failures fall back
// =============================================================================

#[tokio::test]
async fn server_error_falls_back_to_event_text() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
    );
    let url = serve(app).await;
    let narrator = narrator(BackendType::OpenAi, url);
    assert!(narrator.narrate(&boost_request()).await.is_err());

    let (text, from_source) = narrate_with_fallback(&narrator, &boost_request(), None).await;
    assert_eq!(text, "Event: resource_boost");
    assert!(!from_source);
}

#[tokio::test]
async fn slow_backend_hits_simulation_timeout() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            axum::Json(serde_json::json!({"choices": [{"message": {"content": "late"}}]}))
        }),
    );
    let url = serve(app).await;
    let narrator = narrator(BackendType::OpenAi, url);
    let (text, from_source) = narrate_with_fallback(
        &narrator,
        &boost_request(),
        Some(Duration::from_millis(100)),
    )
    .await;
    assert_eq!(text, "Event: resource_boost");
    assert!(!from_source);
}
