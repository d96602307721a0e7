//! The flat settings record bound to one simulation instance.
//!
//! [`SimulationSettings`] is immutable for the lifetime of a simulation:
//! changing any value means constructing a new simulation. Loading,
//! presets, and validation live in `knotworld-core::config`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::ResourceType;
use crate::structs::Coord;

/// Every tunable of a simulation run.
///
/// Field groups: grid and population, agent energy economy, terrain
/// densities, the nine `sqs_*` oscillator constants, the four `sqk_*`
/// effect constants, and presentation pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationSettings {
    // --- Grid and population ---
    /// Number of grid rows.
    pub grid_rows: usize,
    /// Number of grid columns.
    pub grid_cols: usize,
    /// Number of agents spawned at construction.
    pub num_agents: u32,

    // --- Agent energy economy ---
    /// Starting energy and the energy ceiling.
    pub initial_energy: f64,
    /// Energy lost every tick.
    pub energy_depletion_rate: f64,
    /// Energy gained per collected resource (and the boosted-cell bonus).
    pub resource_recharge_amount: f64,
    /// Multiplier on the recharge amount when collecting a plant.
    pub plant_recharge_multiplier: f64,
    /// Cells moved per directional action.
    pub agent_base_speed: u32,
    /// Maximum units held per resource type.
    pub agent_base_carry_capacity: u32,
    /// Absolute energy at or below which agents head for the station.
    pub low_energy_threshold: f64,
    /// Energy gained per Charge action on the station.
    pub charging_station_recharge_per_step: f64,
    /// Fixed location of the charging station.
    pub charging_station: Coord,

    // --- Terrain ---
    /// Obstacle probability per cell.
    pub obstacle_density: f64,
    /// Placement density per resource type, scattered in key order.
    pub resource_densities: BTreeMap<ResourceType, f64>,
    /// Scales the per-tick probability of a resource respawning.
    pub resource_respawn_rate: f64,

    // --- SubQuantum oscillators ---
    /// Energy channel frequency.
    pub sqs_f_energy: f64,
    /// Phase channel frequency.
    pub sqs_f_phase: f64,
    /// Half-width of the uniform noise added to both channels.
    pub sqs_noise_factor: f64,
    /// Both channels must exceed this for a knot.
    pub sqs_threshold_s: f64,
    /// Rounding digits used for knot matching.
    pub sqs_decimal_precision: u32,
    /// Period over which time is normalized, in ticks.
    pub sqs_max_sim_time_period: u64,
    /// Scaling constant of the `Re(s)` projection.
    pub sqs_res_projection_c: f64,
    /// Fraction of the knot threshold used by the communication predicate.
    pub sqs_comm_threshold_factor: f64,
    /// Rounding digits used by the communication predicate.
    pub sqs_comm_decimal_precision: u32,

    // --- SQK effects ---
    /// Shortest effect duration in ticks.
    pub sqk_effect_duration_min: u32,
    /// Longest effect duration in ticks (inclusive).
    pub sqk_effect_duration_max: u32,
    /// Lower bound of the speed boost multiplier.
    pub sqk_speed_boost_multiplier_min: f64,
    /// Upper bound of the speed boost multiplier.
    pub sqk_speed_boost_multiplier_max: f64,

    // --- Pacing and display ---
    /// Wall-clock milliseconds between ticks when run on a timer.
    pub simulation_tick_ms: u64,
    /// Display-only flag: show raw (unrounded) wave values.
    pub show_internal_wave_values: bool,
    /// RNG seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Default placement densities per resource type.
pub fn default_resource_densities() -> BTreeMap<ResourceType, f64> {
    BTreeMap::from([
        (ResourceType::Ore, 0.08),
        (ResourceType::Tree, 0.06),
        (ResourceType::Water, 0.05),
        (ResourceType::Plant, 0.03),
        (ResourceType::NewResource, 0.02),
    ])
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            grid_rows: 20,
            grid_cols: 20,
            num_agents: 2,
            initial_energy: 200.0,
            energy_depletion_rate: 0.5,
            resource_recharge_amount: 20.0,
            plant_recharge_multiplier: 2.0,
            agent_base_speed: 1,
            agent_base_carry_capacity: 2,
            low_energy_threshold: 50.0,
            charging_station_recharge_per_step: 15.0,
            charging_station: Coord::new(0, 0),
            obstacle_density: 0.05,
            resource_densities: default_resource_densities(),
            resource_respawn_rate: 0.01,
            sqs_f_energy: 0.008,
            sqs_f_phase: 0.0082,
            sqs_noise_factor: 0.03,
            sqs_threshold_s: 0.96,
            sqs_decimal_precision: 3,
            sqs_max_sim_time_period: 500,
            sqs_res_projection_c: 0.10,
            sqs_comm_threshold_factor: 0.90,
            sqs_comm_decimal_precision: 2,
            sqk_effect_duration_min: 20,
            sqk_effect_duration_max: 40,
            sqk_speed_boost_multiplier_min: 1.3,
            sqk_speed_boost_multiplier_max: 1.8,
            simulation_tick_ms: 200,
            show_internal_wave_values: false,
            seed: None,
        }
    }
}

impl SimulationSettings {
    /// Number of cells in the grid.
    pub const fn area(&self) -> usize {
        self.grid_rows.saturating_mul(self.grid_cols)
    }
}
