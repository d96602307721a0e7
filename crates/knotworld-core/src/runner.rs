//! Simulation loop runner with operator controls.
//!
//! This module provides [`run_simulation`], the top-level async function
//! that drives [`Simulation::advance`] with support for:
//!
//! - **Bounded runs**: stop after `max_ticks`
//! - **Pause/resume**: the operator can halt and continue the loop
//! - **Single step**: run exactly one tick while paused
//! - **Variable tick speed**: interval adjustable at runtime
//! - **Reset**: rebuild the simulation from a preset and overrides
//! - **Operator stop**: clean stop via the observer API

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{self, ConfigError};
use crate::narrative::NarrativeSource;
use crate::operator::{OperatorState, ResetRequest, SimulationEndReason};
use crate::simulation::{Simulation, SimulationError, TickSummary};

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the run ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total ticks executed, across resets.
    pub total_ticks: u64,
}

/// Callback invoked as the run progresses.
///
/// Implementations use this to update the observer snapshot and broadcast
/// tick summaries.
pub trait TickCallback: Send {
    /// Called after every tick.
    fn on_tick(&mut self, summary: &TickSummary, simulation: &Simulation);

    /// Called after the simulation has been rebuilt by a reset.
    fn on_reset(&mut self, _simulation: &Simulation) {}
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _simulation: &Simulation) {}
}

/// Errors from applying a reset request.
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    /// The requested settings did not resolve.
    #[error("reset settings rejected: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The simulation could not be built from them.
    #[error("reset failed: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: SimulationError,
    },
}

/// Build a replacement simulation for `request`, keeping the narrative
/// timeout of `current`.
///
/// # Errors
///
/// Returns [`ResetError`] if the settings are invalid or the world cannot
/// be built.
pub fn rebuild(current: &Simulation, request: &ResetRequest) -> Result<Simulation, ResetError> {
    let settings = config::resolve_settings(request.preset, request.settings.as_ref())?;
    Ok(Simulation::new(settings)?.with_narrative_timeout(current.narrative_timeout()))
}

/// Run the simulation loop until a termination condition is met.
///
/// Sleeps the operator's tick interval between ticks. Ticks executed as
/// single steps while paused do not sleep.
pub async fn run_simulation<N: NarrativeSource>(
    simulation: &mut Simulation,
    narrator: &N,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback,
) -> SimulationResult {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = ?operator.max_ticks(),
        tick_interval_ms = operator.tick_interval_ms(),
        paused = operator.is_paused(),
        "Simulation starting"
    );

    loop {
        // --- Apply reset ---
        if let Some(request) = operator.take_reset().await {
            match rebuild(simulation, &request) {
                Ok(fresh) => {
                    *simulation = fresh;
                    last_summary = None;
                    info!(preset = ?request.preset, "Simulation reset");
                    callback.on_reset(simulation);
                }
                Err(e) => warn!(error = %e, "Reset rejected, keeping current simulation"),
            }
        }

        // --- Check stop ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            return finish(operator, SimulationEndReason::OperatorStop, last_summary, total_ticks)
                .await;
        }

        // --- Pause / single step ---
        let stepping = operator.is_paused();
        if stepping && !operator.take_step() {
            operator.wait_for_command().await;
            continue;
        }

        // --- Execute tick ---
        let summary = simulation.advance(narrator).await;
        total_ticks = total_ticks.saturating_add(1);
        callback.on_tick(&summary, simulation);

        if operator.tick_limit_reached(summary.tick) {
            info!(tick = summary.tick, max_ticks = ?operator.max_ticks(), "Tick limit reached");
            return finish(
                operator,
                SimulationEndReason::MaxTicksReached,
                Some(summary),
                total_ticks,
            )
            .await;
        }
        last_summary = Some(summary);

        // --- Sleep for tick interval ---
        if stepping {
            debug!("Single step complete");
            continue;
        }
        let interval_ms = operator.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    }
}

async fn finish(
    operator: &OperatorState,
    end_reason: SimulationEndReason,
    final_summary: Option<TickSummary>,
    total_ticks: u64,
) -> SimulationResult {
    operator.set_end_reason(end_reason).await;
    SimulationResult {
        end_reason,
        final_summary,
        total_ticks,
    }
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult, simulation: &Simulation) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = simulation.tick(),
        knots = simulation.subquantum().knot_history.len(),
        "Simulation ended"
    );
    match result.final_summary {
        Some(ref summary) => info!(
            tick = summary.tick,
            active_agents = summary.active_agents(),
            effect_remaining = ?summary.effect_remaining,
            "Final tick summary"
        ),
        None => warn!("Simulation ended with no ticks executed"),
    }
}
