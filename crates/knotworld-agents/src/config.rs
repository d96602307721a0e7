//! Agent-facing slice of the simulation settings.
//!
//! [`AgentConfig`] bundles every tunable the policy and resolution code
//! read, so that they can be exercised in tests without building a whole
//! [`SimulationSettings`] record.

use knotworld_types::{Coord, SimulationSettings};

/// Energy economy and movement parameters applied to every agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Starting energy and the energy ceiling (default: 200).
    pub initial_energy: f64,

    /// Energy lost every tick (default: 0.5).
    pub energy_depletion_rate: f64,

    /// Energy per collected resource, and the boosted-cell bonus
    /// (default: 20).
    pub resource_recharge_amount: f64,

    /// Multiplier on the recharge amount for plants (default: 2).
    pub plant_recharge_multiplier: f64,

    /// Cells moved per directional action (default: 1).
    pub base_speed: u32,

    /// Maximum units held per resource type (default: 2).
    pub carry_capacity: u32,

    /// Absolute energy at or below which an agent seeks the station
    /// (default: 50).
    pub low_energy_threshold: f64,

    /// Energy gained per Charge on the station (default: 15).
    pub station_recharge_per_step: f64,

    /// Where the charging station is.
    pub charging_station: Coord,
}

impl AgentConfig {
    /// Extract the agent parameters from a settings record.
    pub const fn from_settings(settings: &SimulationSettings) -> Self {
        Self {
            initial_energy: settings.initial_energy,
            energy_depletion_rate: settings.energy_depletion_rate,
            resource_recharge_amount: settings.resource_recharge_amount,
            plant_recharge_multiplier: settings.plant_recharge_multiplier,
            base_speed: settings.agent_base_speed,
            carry_capacity: settings.agent_base_carry_capacity,
            low_energy_threshold: settings.low_energy_threshold,
            station_recharge_per_step: settings.charging_station_recharge_per_step,
            charging_station: settings.charging_station,
        }
    }

    /// Whether charging outpaces depletion, in which case a Charge tick
    /// skips the depletion step.
    pub fn charging_is_net_gain(&self) -> bool {
        self.station_recharge_per_step > self.energy_depletion_rate
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::from_settings(&SimulationSettings::default())
    }
}
