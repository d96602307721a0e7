//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST, operator, and `WebSocket`) into a single
//! [`Router`] with permissive CORS for browser clients.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, operator, ws};

/// Build the complete Axum router for the Observer server.
///
/// See [`handlers`] and [`operator`] for the endpoint tables. The tick
/// stream is served at `GET /ws/ticks`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws/ticks", get(ws::ws_ticks))
        // REST API
        .route("/api/state", get(handlers::get_state))
        .route("/api/settings", get(handlers::get_settings))
        .route("/api/presets", get(handlers::list_presets))
        .route("/api/agents", get(handlers::list_agents))
        .route("/api/agents/{id}", get(handlers::get_agent))
        .route("/api/knots", get(handlers::get_knots))
        // Operator controls
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/step", post(operator::step))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/reset", post(operator::reset))
        .route("/api/operator/stop", post(operator::stop))
        .route("/api/operator/status", get(operator::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
