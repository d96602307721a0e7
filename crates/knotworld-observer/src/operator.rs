//! Operator REST API handlers for runtime simulation control.
//!
//! Commands are recorded on the shared [`OperatorState`] and picked up by
//! the run loop between ticks.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause the tick loop |
//! | `POST` | `/api/operator/resume` | Resume the tick loop |
//! | `POST` | `/api/operator/step` | Run one tick while paused |
//! | `POST` | `/api/operator/speed` | Set tick interval (ms) |
//! | `POST` | `/api/operator/reset` | Rebuild with a preset and/or overrides |
//! | `POST` | `/api/operator/stop` | End the run |
//! | `GET` | `/api/operator/status` | Current run status |
//!
//! [`OperatorState`]: knotworld_core::OperatorState

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use knotworld_core::config::resolve_settings;
use knotworld_core::operator::{MIN_TICK_INTERVAL_MS, OperatorState};
use knotworld_core::{ResetRequest, SimulationStatus};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New tick interval in milliseconds.
    pub tick_interval_ms: u64,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

impl OperatorResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            ok: true,
            message: message.into(),
        })
    }
}

fn operator(state: &AppState) -> Result<&Arc<OperatorState>, ObserverError> {
    state
        .operator_state
        .as_ref()
        .ok_or_else(|| ObserverError::Internal("operator state not available".to_owned()))
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause, /resume, /step
// ---------------------------------------------------------------------------

/// Pause the simulation tick loop.
pub async fn pause(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.pause();
    Ok(OperatorResponse::ok("Simulation paused"))
}

/// Resume the simulation tick loop. Queued single steps are discarded.
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.resume();
    Ok(OperatorResponse::ok("Simulation resumed"))
}

/// Queue one tick. Only accepted while paused.
pub async fn step(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let pending = operator(&state)?.request_step().ok_or_else(|| {
        ObserverError::Conflict("single steps are only accepted while paused".to_owned())
    })?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "message": "Step queued",
        "pending_steps": pending,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/operator/speed
// ---------------------------------------------------------------------------

/// Change the tick interval at runtime.
///
/// The new interval applies from the next sleep.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let prev = operator(&state)?
        .set_tick_interval_ms(body.tick_interval_ms)
        .ok_or_else(|| {
            ObserverError::InvalidRequest(format!(
                "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            ))
        })?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!("Tick interval changed from {prev}ms to {}ms", body.tick_interval_ms),
        "previous_interval_ms": prev,
        "new_interval_ms": body.tick_interval_ms,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/operator/reset
// ---------------------------------------------------------------------------

/// Queue a rebuild of the simulation from a preset and/or overrides.
///
/// The settings are resolved here first so that an invalid request is
/// rejected with `400` instead of being dropped by the run loop.
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;
    let settings = resolve_settings(body.preset, body.settings.as_ref())
        .map_err(|e| ObserverError::InvalidRequest(e.to_string()))?;
    let message = format!(
        "Reset queued: {}x{} grid, {} agents",
        settings.grid_rows, settings.grid_cols, settings.num_agents
    );
    operator.request_reset(body).await;
    Ok(OperatorResponse::ok(message))
}

// ---------------------------------------------------------------------------
// POST /api/operator/stop
// ---------------------------------------------------------------------------

/// Stop the run loop after the current tick.
///
/// The HTTP server keeps serving the final snapshot.
pub async fn stop(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.request_stop();
    Ok(OperatorResponse::ok("Stop requested"))
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Return the current run status.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;
    let (tick, active_agents, agents_total) = {
        let snapshot = state.snapshot.read().await;
        (snapshot.tick, snapshot.active_agents(), snapshot.agents.len())
    };

    let status = SimulationStatus {
        tick,
        paused: operator.is_paused(),
        pending_steps: operator.pending_steps(),
        stop_requested: operator.is_stop_requested(),
        tick_interval_ms: operator.tick_interval_ms(),
        elapsed_seconds: operator.elapsed_seconds(),
        max_ticks: operator.max_ticks(),
        active_agents,
        agents_total,
        end_reason: operator.end_reason().await,
        started_at: operator.started_at().to_rfc3339(),
    };

    Ok(Json(status))
}
