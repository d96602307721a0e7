//! Applying a chosen action to an agent and the grid.
//!
//! Resolution runs once per agent per tick, in ascending id order. It never
//! fails: ineffective actions (charging off the station, collecting from
//! an empty cell, moving into an obstacle) simply have no effect. After
//! the action, energy depletion is applied and the position re-clamped.

use knotworld_types::{Agent, AgentAction, Coord, Direction, ResourceType, SqkEffect};
use knotworld_world::GridWorld;
use serde::{Deserialize, Serialize};

use crate::agent::effective_speed;
use crate::config::AgentConfig;
use crate::energy;
use crate::inventory;

/// What an action actually did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The agent moved.
    Moved {
        /// Start cell.
        from: Coord,
        /// End cell.
        to: Coord,
    },
    /// The destination was an obstacle; the agent stayed put.
    Blocked {
        /// Rejected destination.
        target: Coord,
    },
    /// A resource was taken from the agent's cell.
    Collected {
        /// The resource taken.
        resource: ResourceType,
        /// Whether the cell was boosted.
        boosted: bool,
        /// Energy gained after capping.
        gained: f64,
    },
    /// The agent charged on the station.
    Charged {
        /// Energy gained after capping.
        gained: f64,
    },
    /// The action had no effect (including every action of a depleted
    /// agent).
    NoEffect,
    /// The agent idled.
    Idle,
}

fn resolve_move(
    agent: &mut Agent,
    world: &GridWorld,
    config: &AgentConfig,
    effect: Option<&SqkEffect>,
    direction: Direction,
) -> ActionOutcome {
    let distance = usize::try_from(effective_speed(agent, config, effect)).unwrap_or(1);
    let from = agent.position;
    let to = world.step_target(from, direction, distance);
    if world.is_blocked(to) {
        return ActionOutcome::Blocked { target: to };
    }
    agent.position = to;
    ActionOutcome::Moved { from, to }
}

fn resolve_collect(agent: &mut Agent, world: &mut GridWorld, config: &AgentConfig) -> ActionOutcome {
    let here = agent.position;
    let can_take = world
        .resource_at(here)
        .is_some_and(|r| inventory::has_capacity(agent, r));
    if !can_take {
        return ActionOutcome::NoEffect;
    }
    let Some((resource, boosted)) = world.consume(here) else {
        return ActionOutcome::NoEffect;
    };
    if inventory::add_one(agent, resource).is_err() {
        return ActionOutcome::NoEffect;
    }
    let gained = energy::gain(agent, config, energy::collect_gain(config, resource, boosted));
    ActionOutcome::Collected {
        resource,
        boosted,
        gained,
    }
}

fn resolve_charge(agent: &mut Agent, config: &AgentConfig) -> ActionOutcome {
    if agent.position != config.charging_station {
        return ActionOutcome::NoEffect;
    }
    let gained = energy::gain(agent, config, config.station_recharge_per_step);
    ActionOutcome::Charged { gained }
}

/// Apply `action` for `agent`, then deplete its energy for the tick.
///
/// A depleted agent is frozen: its position, inventory, and the grid are
/// left untouched and its energy stays at zero.
pub fn resolve_action(
    agent: &mut Agent,
    action: AgentAction,
    world: &mut GridWorld,
    config: &AgentConfig,
    effect: Option<&SqkEffect>,
) -> ActionOutcome {
    if agent.is_depleted() {
        agent.energy = 0.0;
        return ActionOutcome::NoEffect;
    }

    let outcome = match action {
        AgentAction::Move(direction) => resolve_move(agent, world, config, effect, direction),
        AgentAction::Collect => resolve_collect(agent, world, config),
        AgentAction::Charge => resolve_charge(agent, config),
        AgentAction::Idle => ActionOutcome::Idle,
    };

    energy::deplete(agent, config, action);
    agent.position = world.clamp(agent.position);
    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use knotworld_types::{AgentId, EffectDetails, SpeedTarget};

    use super::*;

    fn make_agent(position: Coord, energy: f64) -> Agent {
        Agent {
            id: AgentId::new(0),
            position,
            energy,
            inventory: BTreeMap::new(),
            speed: 1,
            carry_capacity: 2,
        }
    }

    fn open_world() -> GridWorld {
        GridWorld::new(5, 5, Coord::new(0, 0)).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn collecting_boosted_plant_grants_sixty() {
        let mut world = open_world();
        let at = Coord::new(2, 2);
        world.set_resource(at, ResourceType::Plant).unwrap();
        world.set_boosted(at, true);
        let config = AgentConfig {
            energy_depletion_rate: 0.0,
            ..AgentConfig::default()
        };
        let mut agent = make_agent(at, 100.0);

        let outcome = resolve_action(&mut agent, AgentAction::Collect, &mut world, &config, None);

        assert!(matches!(
            outcome,
            ActionOutcome::Collected {
                resource: ResourceType::Plant,
                boosted: true,
                ..
            }
        ));
        assert!(approx(agent.energy, 160.0));
        assert_eq!(agent.held(ResourceType::Plant), 1);
        let cell = world.cell(at).unwrap();
        assert_eq!(cell.resource, ResourceType::Empty);
        assert!(!cell.is_boosted);
    }

    #[test]
    fn collect_gain_is_capped() {
        let mut world = open_world();
        let at = Coord::new(1, 1);
        world.set_resource(at, ResourceType::Plant).unwrap();
        let config = AgentConfig::default();
        let mut agent = make_agent(at, 190.0);
        resolve_action(&mut agent, AgentAction::Collect, &mut world, &config, None);
        assert!(approx(agent.energy, 199.5));
    }

    #[test]
    fn collect_at_capacity_leaves_cell() {
        let mut world = open_world();
        let at = Coord::new(1, 1);
        world.set_resource(at, ResourceType::Ore).unwrap();
        let mut agent = make_agent(at, 100.0);
        agent.inventory.insert(ResourceType::Ore, 2);
        let outcome = resolve_action(
            &mut agent,
            AgentAction::Collect,
            &mut world,
            &AgentConfig::default(),
            None,
        );
        assert_eq!(outcome, ActionOutcome::NoEffect);
        assert_eq!(world.resource_at(at), Some(ResourceType::Ore));
        assert_eq!(agent.held(ResourceType::Ore), 2);
    }

    #[test]
    fn charge_only_works_on_station() {
        let mut world = open_world();
        let config = AgentConfig::default();
        let mut away = make_agent(Coord::new(1, 0), 100.0);
        assert_eq!(
            resolve_action(&mut away, AgentAction::Charge, &mut world, &config, None),
            ActionOutcome::NoEffect
        );
        // Recharge beats depletion, so no depletion is taken either way.
        assert!(approx(away.energy, 100.0));

        let mut home = make_agent(Coord::new(0, 0), 100.0);
        resolve_action(&mut home, AgentAction::Charge, &mut world, &config, None);
        assert!(approx(home.energy, 115.0));
    }

    #[test]
    fn moves_clamp_and_respect_obstacles() {
        let mut world = open_world();
        let config = AgentConfig::default();
        let mut agent = make_agent(Coord::new(0, 2), 100.0);

        let outcome = resolve_action(
            &mut agent,
            AgentAction::Move(Direction::North),
            &mut world,
            &config,
            None,
        );
        assert_eq!(
            outcome,
            ActionOutcome::Moved {
                from: Coord::new(0, 2),
                to: Coord::new(0, 2)
            }
        );

        world.set_resource(Coord::new(1, 2), ResourceType::Obstacle).unwrap();
        let outcome = resolve_action(
            &mut agent,
            AgentAction::Move(Direction::South),
            &mut world,
            &config,
            None,
        );
        assert_eq!(
            outcome,
            ActionOutcome::Blocked {
                target: Coord::new(1, 2)
            }
        );
        assert_eq!(agent.position, Coord::new(0, 2));
        assert!(approx(agent.energy, 99.0));
    }

    #[test]
    fn speed_boost_jumps_over_obstacles() {
        let mut world = open_world();
        world.set_resource(Coord::new(2, 1), ResourceType::Obstacle).unwrap();
        let effect = SqkEffect {
            details: EffectDetails::AgentSpeedBoost {
                target: SpeedTarget::All,
                multiplier: 2.0,
            },
            remaining_duration: 3,
            narrative: None,
        };
        let mut agent = make_agent(Coord::new(2, 0), 100.0);
        resolve_action(
            &mut agent,
            AgentAction::Move(Direction::East),
            &mut world,
            &AgentConfig::default(),
            Some(&effect),
        );
        assert_eq!(agent.position, Coord::new(2, 2));
    }

    #[test]
    fn depleted_agent_is_frozen_even_on_station() {
        let mut world = open_world();
        world.set_resource(Coord::new(0, 1), ResourceType::Ore).unwrap();
        let config = AgentConfig::default();

        let mut parked = make_agent(Coord::new(0, 0), 0.0);
        for action in [
            AgentAction::Charge,
            AgentAction::Move(Direction::East),
            AgentAction::Collect,
        ] {
            assert_eq!(
                resolve_action(&mut parked, action, &mut world, &config, None),
                ActionOutcome::NoEffect
            );
        }
        assert_eq!(parked.position, Coord::new(0, 0));
        assert!(approx(parked.energy, 0.0));

        let mut stuck = make_agent(Coord::new(0, 1), 0.0);
        resolve_action(&mut stuck, AgentAction::Collect, &mut world, &config, None);
        assert!(stuck.inventory.is_empty());
        assert_eq!(world.resource_at(Coord::new(0, 1)), Some(ResourceType::Ore));
    }
}
