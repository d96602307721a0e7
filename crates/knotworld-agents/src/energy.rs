//! Energy economy applied to agents each tick.
//!
//! - Collecting grants the recharge amount, times the plant multiplier for
//!   plants, plus the recharge amount again when the cell was boosted.
//! - Charging on the station grants the per-step recharge.
//! - Every tick costs the depletion rate, except a Charge tick when the
//!   station recharges faster than agents deplete.
//!
//! Energy always stays within `[0, initial_energy]`.

use knotworld_types::{Agent, AgentAction, ResourceType};

use crate::config::AgentConfig;

/// Energy granted for collecting `resource`, before capping.
pub fn collect_gain(config: &AgentConfig, resource: ResourceType, boosted: bool) -> f64 {
    let base = if resource == ResourceType::Plant {
        config.resource_recharge_amount * config.plant_recharge_multiplier
    } else {
        config.resource_recharge_amount
    };
    if boosted {
        base + config.resource_recharge_amount
    } else {
        base
    }
}

/// Add `amount` to the agent's energy, capped at the ceiling. Returns the
/// energy actually gained.
pub fn gain(agent: &mut Agent, config: &AgentConfig, amount: f64) -> f64 {
    let before = agent.energy;
    agent.energy = (before + amount).min(config.initial_energy).max(0.0);
    agent.energy - before
}

/// Apply the end-of-tick depletion for an agent that took `action`.
pub fn deplete(agent: &mut Agent, config: &AgentConfig, action: AgentAction) {
    let exempt = action == AgentAction::Charge && config.charging_is_net_gain();
    if !exempt {
        agent.energy -= config.energy_depletion_rate;
    }
    agent.energy = agent.energy.clamp(0.0, config.initial_energy);
}
