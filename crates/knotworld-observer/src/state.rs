//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel for tick summaries and the
//! latest [`SimulationSnapshot`] that the REST endpoints serve.

use std::sync::Arc;

use knotworld_core::effect;
use knotworld_core::operator::OperatorState;
use knotworld_core::{AgentTick, Respawn, TickSummary};
use knotworld_types::{AgentId, EffectKind, KnotEvent, SimulationSnapshot};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};

/// Capacity of the broadcast channel for tick summaries.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// Raw oscillator values, only published when the settings ask for them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawWaves {
    /// Unrounded energy channel value.
    pub energy_wave: f64,
    /// Unrounded phase channel value.
    pub phase_wave: f64,
}

/// JSON-serializable tick summary pushed over the `WebSocket`.
///
/// A projection of [`TickSummary`] with wave values formatted at the knot
/// precision and the narrative of a freshly started effect attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickBroadcast {
    /// Completed ticks.
    pub tick: u64,
    /// Energy channel value at the knot precision.
    pub energy_wave: String,
    /// Phase channel value at the knot precision.
    pub phase_wave: String,
    /// Raw channel values when `show_internal_wave_values` is set.
    pub raw_waves: Option<RawWaves>,
    /// Whether the communication predicate held.
    pub communication_conducive: bool,
    /// The knot that fired, if any.
    pub knot: Option<KnotEvent>,
    /// Whether a knot fired but was ignored because an effect was running.
    pub knot_ignored: bool,
    /// Variant of the effect started this tick.
    pub effect_started: Option<EffectKind>,
    /// Narrative of the effect started this tick.
    pub narrative: Option<String>,
    /// Agents sped up by the effect started this tick.
    pub affected_agents: Vec<AgentId>,
    /// Variant of the effect that expired this tick.
    pub effect_expired: Option<EffectKind>,
    /// Ticks left on the active effect.
    pub effect_remaining: Option<u32>,
    /// Agents with energy left.
    pub active_agents: usize,
    /// Per-agent actions in resolution order.
    pub agents: Vec<AgentTick>,
    /// Resource respawned this tick.
    pub respawn: Option<Respawn>,
}

impl TickBroadcast {
    /// Build the broadcast for `summary`, using the snapshot taken right
    /// after the tick for display settings and the effect narrative.
    pub fn from_summary(summary: &TickSummary, snapshot: &SimulationSnapshot) -> Self {
        let precision = snapshot.settings.sqs_decimal_precision;
        let raw_waves = snapshot
            .settings
            .show_internal_wave_values
            .then_some(RawWaves {
                energy_wave: summary.energy_wave,
                phase_wave: summary.phase_wave,
            });
        let started = summary
            .effect_started
            .and_then(|_| snapshot.active_effect.as_ref());
        let narrative = started.and_then(|effect| effect.narrative.clone());
        let affected_agents = started
            .map(|active| effect::affected_agents(active, &snapshot.agents))
            .unwrap_or_default();

        Self {
            tick: summary.tick,
            energy_wave: format_wave(summary.energy_wave, precision),
            phase_wave: format_wave(summary.phase_wave, precision),
            raw_waves,
            communication_conducive: summary.communication_conducive,
            knot: summary.knot,
            knot_ignored: summary.knot_ignored,
            effect_started: summary.effect_started,
            narrative,
            affected_agents,
            effect_expired: summary.effect_expired,
            effect_remaining: summary.effect_remaining,
            active_agents: summary.active_agents(),
            agents: summary.agents.clone(),
            respawn: summary.respawn,
        }
    }
}

/// Format a wave value with `precision` decimal places.
pub fn format_wave(value: f64, precision: u32) -> String {
    let digits = usize::try_from(precision).unwrap_or(3);
    format!("{value:.digits$}")
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Broadcast sender for tick summary messages.
    pub tx: broadcast::Sender<TickBroadcast>,
    /// The latest simulation snapshot (replaced each tick).
    pub snapshot: Arc<RwLock<SimulationSnapshot>>,
    /// Shared operator control state (present when a run loop is attached).
    pub operator_state: Option<Arc<OperatorState>>,
}

impl AppState {
    /// Create a read-only application state around an initial snapshot.
    pub fn new(initial: SimulationSnapshot) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(initial)),
            operator_state: None,
        }
    }

    /// Create an application state with operator control state attached.
    pub fn with_operator(initial: SimulationSnapshot, operator: Arc<OperatorState>) -> Self {
        Self {
            operator_state: Some(operator),
            ..Self::new(initial)
        }
    }

    /// Subscribe to the tick broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TickBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a tick summary to all connected clients.
    ///
    /// Returns the number of receivers that received the message, 0 if
    /// no clients are connected.
    pub fn broadcast(&self, summary: &TickBroadcast) -> usize {
        // send fails only when there are no receivers.
        self.tx.send(summary.clone()).unwrap_or(0)
    }

    /// Replace the served snapshot without waiting.
    ///
    /// Returns `false` if a reader holds the lock; the next tick's snapshot
    /// will catch up.
    pub fn try_publish_snapshot(&self, snapshot: SimulationSnapshot) -> bool {
        self.snapshot.try_write().map_or(false, |mut guard| {
            *guard = snapshot;
            true
        })
    }
}
