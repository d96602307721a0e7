//! Read-only snapshot of a simulation, handed to presentation clients.
//!
//! A [`SimulationSnapshot`] is an owned copy. Mutating it has no effect on
//! the simulation it was taken from.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::AgentId;
use crate::settings::SimulationSettings;
use crate::structs::{Agent, Coord, GridCell, SqkEffect, SubQuantumState};

/// Everything an observer needs to render one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationSnapshot {
    /// Grid cells, row-major: `grid[row][col]`.
    pub grid: Vec<Vec<GridCell>>,
    /// Agents in ascending id order.
    pub agents: Vec<Agent>,
    /// Oscillator state after the most recent update.
    pub subquantum: SubQuantumState,
    /// The active SQK effect, if any.
    pub active_effect: Option<SqkEffect>,
    /// Number of completed ticks.
    pub tick: u64,
    /// Absolute time fed to the oscillators on the next tick.
    pub simulation_time: u64,
    /// Settings the simulation was built with.
    pub settings: SimulationSettings,
}

impl SimulationSnapshot {
    /// The cell at `coord`, if in bounds.
    pub fn cell(&self, coord: Coord) -> Option<&GridCell> {
        self.grid.get(coord.row).and_then(|row| row.get(coord.col))
    }

    /// The agent with the given id.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Number of agents with energy left.
    pub fn active_agents(&self) -> usize {
        self.agents.iter().filter(|a| !a.is_depleted()).count()
    }

    /// Energy and phase wave values formatted at the knot precision, as the
    /// status panel shows them.
    pub fn rounded_waves(&self) -> (String, String) {
        let digits = usize::try_from(self.settings.sqs_decimal_precision).unwrap_or(3);
        (
            format!("{:.digits$}", self.subquantum.energy_wave),
            format!("{:.digits$}", self.subquantum.phase_wave),
        )
    }
}
