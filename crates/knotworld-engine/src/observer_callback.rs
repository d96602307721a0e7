//! Tick callback that updates the Observer API state.
//!
//! After each tick this callback broadcasts a [`TickBroadcast`] to every
//! connected `WebSocket` client and replaces the served snapshot.

use std::sync::Arc;

use knotworld_core::{Simulation, TickCallback, TickSummary};
use knotworld_observer::{AppState, TickBroadcast};
use tracing::{debug, info};

/// Callback that bridges the run loop to the Observer API.
pub struct ObserverCallback {
    state: Arc<AppState>,
}

impl ObserverCallback {
    /// Create a new observer callback backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl TickCallback for ObserverCallback {
    fn on_tick(&mut self, summary: &TickSummary, simulation: &Simulation) {
        let snapshot = simulation.snapshot();
        let message = TickBroadcast::from_summary(summary, &snapshot);

        let receivers = self.state.broadcast(&message);
        debug!(tick = summary.tick, receivers, "Tick broadcast sent");

        // A REST handler holding the read lock only delays the snapshot by
        // one tick.
        if !self.state.try_publish_snapshot(snapshot) {
            debug!(tick = summary.tick, "snapshot busy, skipped update");
        }
    }

    fn on_reset(&mut self, simulation: &Simulation) {
        let published = self.state.try_publish_snapshot(simulation.snapshot());
        info!(
            rows = simulation.settings().grid_rows,
            cols = simulation.settings().grid_cols,
            agents = simulation.agents().len(),
            published,
            "Observer snapshot reset"
        );
    }
}
