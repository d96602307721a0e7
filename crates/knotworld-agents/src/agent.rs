//! Agent creation and effective movement speed.
//!
//! Agents are numbered densely from zero, start at full energy with an
//! empty inventory, and are placed on distinct passable cells away from
//! the charging station.

use std::collections::BTreeMap;

use knotworld_types::{Agent, AgentId, SqkEffect};
use knotworld_world::{GridWorld, pick_agent_starts};
use rand::Rng;
use tracing::debug;

use crate::config::AgentConfig;
use crate::error::AgentError;

/// Create `count` agents at random start cells.
///
/// # Errors
///
/// Returns [`AgentError::World`] when the grid has too few eligible cells,
/// or [`AgentError::TooManyAgents`] if ids would overflow.
pub fn spawn_agents(
    world: &GridWorld,
    config: &AgentConfig,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Agent>, AgentError> {
    let starts = pick_agent_starts(world, count, rng)?;
    starts
        .into_iter()
        .enumerate()
        .map(|(index, position)| {
            let Ok(raw) = u32::try_from(index) else {
                return Err(AgentError::TooManyAgents(count));
            };
            debug!(agent = raw, position = %position, "agent spawned");
            Ok(Agent {
                id: AgentId::new(raw),
                position,
                energy: config.initial_energy,
                inventory: BTreeMap::new(),
                speed: config.base_speed.max(1),
                carry_capacity: config.carry_capacity,
            })
        })
        .collect()
}

/// Cells moved by one directional action this tick.
///
/// Without a matching speed boost this is the agent's base speed. With one
/// it is `floor(base_speed * multiplier)`, never below 1.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn effective_speed(agent: &Agent, config: &AgentConfig, effect: Option<&SqkEffect>) -> u32 {
    let boosted = effect
        .and_then(|e| e.speed_multiplier_for(agent.id))
        .map(|multiplier| {
            let raw = (f64::from(config.base_speed) * multiplier).floor();
            if raw.is_finite() && raw >= 1.0 {
                raw.min(f64::from(u32::MAX)) as u32
            } else {
                1
            }
        });
    boosted.unwrap_or(agent.speed).max(1)
}
