//! REST API endpoint handlers for the Observer server.
//!
//! All handlers read from the in-memory [`SimulationSnapshot`] via the
//! shared [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/state` | Full simulation snapshot |
//! | `GET` | `/api/settings` | Settings the simulation runs with |
//! | `GET` | `/api/presets` | Every named preset, fully resolved |
//! | `GET` | `/api/agents` | List all agents |
//! | `GET` | `/api/agents/{id}` | Single agent |
//! | `GET` | `/api/knots` | Knot history and the rounded wave readout |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use knotworld_core::Preset;
use knotworld_types::{
    AgentId, Coord, KnotEvent, ResourceType, SimulationSettings, SimulationSnapshot,
};
use serde::Serialize;

use crate::error::ObserverError;
use crate::state::{AppState, RawWaves};

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One entry of `GET /api/presets`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresetEntry {
    /// Preset name as accepted by the config file and reset requests.
    pub name: &'static str,
    /// Defaults with the preset applied.
    pub settings: SimulationSettings,
}

/// Body of `GET /api/knots`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnotsResponse {
    /// Energy channel value at the knot precision.
    pub energy_wave: String,
    /// Phase channel value at the knot precision.
    pub phase_wave: String,
    /// Raw channel values when `show_internal_wave_values` is set.
    pub raw_waves: Option<RawWaves>,
    /// Whether the communication predicate currently holds.
    pub communication_conducive: bool,
    /// The most recent knot.
    pub last: Option<KnotEvent>,
    /// Recent knots, oldest first.
    pub history: Vec<KnotEvent>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page with the grid, agents, and wave readout.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    let tick = snapshot.tick;
    let (energy_wave, phase_wave) = snapshot.rounded_waves();
    let active = snapshot.active_agents();
    let total = snapshot.agents.len();
    let effect = snapshot.active_effect.as_ref().map_or_else(
        || "none".to_owned(),
        |e| {
            format!(
                "{} ({} left): {}",
                e.kind(),
                e.remaining_duration,
                escape_html(e.narrative.as_deref().unwrap_or(""))
            )
        },
    );
    let last_knot = snapshot
        .subquantum
        .last_knot()
        .map_or_else(|| "none yet".to_owned(), |k| format!("t={}", k.tick));
    let grid = render_grid(&snapshot);
    drop(snapshot);

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Knotworld Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 900px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        pre {{ background: #161b22; padding: 1rem; line-height: 1.1; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
    </style>
</head>
<body>
    <h1>Knotworld Observer</h1>
    <div>
        <div class="metric"><div class="label">Tick</div><div class="value">{tick}</div></div>
        <div class="metric"><div class="label">Energy wave</div><div class="value">{energy_wave}</div></div>
        <div class="metric"><div class="label">Phase wave</div><div class="value">{phase_wave}</div></div>
        <div class="metric"><div class="label">Active agents</div><div class="value">{active}/{total}</div></div>
        <div class="metric"><div class="label">Last knot</div><div class="value">{last_knot}</div></div>
    </div>
    <p>Effect: {effect}</p>
    <pre>{grid}</pre>
    <ul>
        <li><a href="/api/state">/api/state</a></li>
        <li><a href="/api/settings">/api/settings</a></li>
        <li><a href="/api/presets">/api/presets</a></li>
        <li><a href="/api/agents">/api/agents</a></li>
        <li><a href="/api/knots">/api/knots</a></li>
        <li><a href="/api/operator/status">/api/operator/status</a></li>
    </ul>
</body>
</html>"#
    ))
}

/// One character per cell; agents drawn over their cell.
fn render_grid(snapshot: &SimulationSnapshot) -> String {
    let mut out = String::new();
    for (row, cells) in snapshot.grid.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let here = Coord::new(row, col);
            let ch = if snapshot.agents.iter().any(|a| a.position == here) {
                'A'
            } else if cell.is_boosted {
                '*'
            } else {
                glyph(cell.resource)
            };
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

const fn glyph(resource: ResourceType) -> char {
    match resource {
        ResourceType::Empty => '.',
        ResourceType::Ore => 'o',
        ResourceType::Tree => 'T',
        ResourceType::Water => '~',
        ResourceType::Plant => 'p',
        ResourceType::Obstacle => '#',
        ResourceType::NewResource => 'n',
        ResourceType::Goal => 'G',
        ResourceType::ChargingStation => 'C',
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// GET /api/state, /api/settings, /api/presets
// ---------------------------------------------------------------------------

/// Return the full snapshot.
pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    Json(snapshot.clone())
}

/// Return the settings the current simulation was built with.
pub async fn get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    Json(snapshot.settings.clone())
}

/// List every preset with its resolved settings.
pub async fn list_presets() -> impl IntoResponse {
    let presets: Vec<PresetEntry> = Preset::ALL
        .into_iter()
        .map(|preset| PresetEntry {
            name: preset.name(),
            settings: preset.settings(),
        })
        .collect();
    Json(presets)
}

// ---------------------------------------------------------------------------
// GET /api/agents, /api/agents/{id}
// ---------------------------------------------------------------------------

/// List all agents in id order.
pub async fn list_agents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    Json(snapshot.agents.clone())
}

/// Get a single agent by numeric id.
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let raw: u32 = id
        .parse()
        .map_err(|e| ObserverError::InvalidRequest(format!("invalid agent id {id:?}: {e}")))?;
    let agent_id = AgentId::new(raw);

    let snapshot = state.snapshot.read().await;
    let agent = snapshot
        .agent(agent_id)
        .cloned()
        .ok_or_else(|| ObserverError::NotFound(format!("agent {agent_id} not found")))?;
    Ok(Json(agent))
}

// ---------------------------------------------------------------------------
// GET /api/knots
// ---------------------------------------------------------------------------

/// Knot history with the wave readout rounded to the knot precision.
pub async fn get_knots(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    let (energy_wave, phase_wave) = snapshot.rounded_waves();
    let sqs = &snapshot.subquantum;
    let raw_waves = snapshot
        .settings
        .show_internal_wave_values
        .then_some(RawWaves {
            energy_wave: sqs.energy_wave,
            phase_wave: sqs.phase_wave,
        });
    Json(KnotsResponse {
        energy_wave,
        phase_wave,
        raw_waves,
        communication_conducive: sqs.communication_conducive,
        last: sqs.last_knot().copied(),
        history: sqs.knot_history.clone(),
    })
}

#[cfg(test)]
mod tests {
    use knotworld_types::GridCell;

    use super::*;

    #[test]
    fn escape_html_handles_markup() {
        assert_eq!(escape_html("a <b> & \"c\""), "a &lt;b&gt; &amp; &quot;c&quot;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn glyphs_cover_landmarks() {
        assert_eq!(glyph(ResourceType::ChargingStation), 'C');
        assert_eq!(glyph(ResourceType::Obstacle), '#');
        assert_eq!(
            glyph(GridCell::empty().resource),
            glyph(ResourceType::Empty)
        );
    }
}
