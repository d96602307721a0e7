//! Per-tick action selection.
//!
//! Each agent is in one of two modes, chosen by comparing its energy to
//! the absolute low-energy threshold:
//!
//! - **Seeking charge** (energy at or below the threshold): charge if on
//!   the station, otherwise step toward it along the axis with the larger
//!   remaining distance (rows win ties). A blocked preferred step falls
//!   back to a random valid move.
//! - **Foraging**: collect what is underfoot with probability
//!   [`COLLECT_PROBABILITY`], otherwise idle with probability
//!   [`IDLE_PROBABILITY`], otherwise wander.
//!
//! Depleted agents always idle.

use knotworld_types::{Agent, AgentAction, Coord, Direction};
use knotworld_world::GridWorld;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::config::AgentConfig;
use crate::inventory::has_capacity;

/// Chance a foraging agent collects when it can.
pub const COLLECT_PROBABILITY: f64 = 0.6;

/// Chance a foraging agent idles instead of wandering.
pub const IDLE_PROBABILITY: f64 = 0.15;

/// The two behavioral modes of a live agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Heading for the charging station.
    SeekingCharge,
    /// Collecting and wandering.
    Foraging,
}

/// Which mode an agent with this energy is in.
pub fn mode_for(agent: &Agent, config: &AgentConfig) -> Mode {
    if agent.energy <= config.low_energy_threshold {
        Mode::SeekingCharge
    } else {
        Mode::Foraging
    }
}

/// The single step that closes the distance to `target` fastest.
///
/// Returns `None` when already there.
pub const fn step_toward(from: Coord, target: Coord) -> Option<Direction> {
    let dr = from.row.abs_diff(target.row);
    let dc = from.col.abs_diff(target.col);
    if dr == 0 && dc == 0 {
        return None;
    }
    if dr >= dc {
        if target.row > from.row {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    } else if target.col > from.col {
        Some(Direction::East)
    } else {
        Some(Direction::West)
    }
}

fn random_move(agent: &Agent, world: &GridWorld, rng: &mut impl Rng) -> AgentAction {
    world
        .valid_moves(agent.position)
        .choose(rng)
        .map_or(AgentAction::Idle, |&d| AgentAction::Move(d))
}

fn seek_charge(agent: &Agent, world: &GridWorld, config: &AgentConfig, rng: &mut impl Rng) -> AgentAction {
    let Some(direction) = step_toward(agent.position, config.charging_station) else {
        return AgentAction::Charge;
    };
    match world.neighbor(agent.position, direction) {
        Some(next) if !world.is_blocked(next) => AgentAction::Move(direction),
        _ => random_move(agent, world, rng),
    }
}

fn forage(agent: &Agent, world: &GridWorld, rng: &mut impl Rng) -> AgentAction {
    let can_collect = world
        .resource_at(agent.position)
        .is_some_and(|r| has_capacity(agent, r));
    if can_collect && rng.random_bool(COLLECT_PROBABILITY) {
        return AgentAction::Collect;
    }
    if rng.random_bool(IDLE_PROBABILITY) {
        return AgentAction::Idle;
    }
    random_move(agent, world, rng)
}

/// Choose this tick's action for `agent`.
pub fn choose_action(
    agent: &Agent,
    world: &GridWorld,
    config: &AgentConfig,
    rng: &mut impl Rng,
) -> AgentAction {
    if agent.is_depleted() {
        return AgentAction::Idle;
    }
    match mode_for(agent, config) {
        Mode::SeekingCharge => seek_charge(agent, world, config, rng),
        Mode::Foraging => forage(agent, world, rng),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use knotworld_types::{AgentId, ResourceType};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

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

    #[test]
    fn step_toward_prefers_rows_on_ties() {
        let station = Coord::new(0, 0);
        assert_eq!(step_toward(Coord::new(2, 2), station), Some(Direction::North));
        assert_eq!(step_toward(Coord::new(1, 3), station), Some(Direction::West));
        assert_eq!(step_toward(Coord::new(0, 0), Coord::new(3, 1)), Some(Direction::South));
        assert_eq!(step_toward(Coord::new(0, 0), Coord::new(1, 3)), Some(Direction::East));
        assert_eq!(step_toward(station, station), None);
    }

    #[test]
    fn low_energy_on_station_charges() {
        let mut rng = SmallRng::seed_from_u64(1);
        let world = open_world();
        let agent = make_agent(Coord::new(0, 0), 10.0);
        let action = choose_action(&agent, &world, &AgentConfig::default(), &mut rng);
        assert_eq!(action, AgentAction::Charge);
    }

    #[test]
    fn low_energy_heads_home() {
        let mut rng = SmallRng::seed_from_u64(1);
        let world = open_world();
        let agent = make_agent(Coord::new(3, 1), 50.0);
        for _ in 0..20 {
            let action = choose_action(&agent, &world, &AgentConfig::default(), &mut rng);
            assert_eq!(action, AgentAction::Move(Direction::North));
        }
    }

    #[test]
    fn blocked_path_falls_back_to_valid_move() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut world = open_world();
        world.set_resource(Coord::new(1, 2), ResourceType::Obstacle).unwrap();
        let agent = make_agent(Coord::new(2, 2), 10.0);
        for _ in 0..50 {
            let action = choose_action(&agent, &world, &AgentConfig::default(), &mut rng);
            assert!(matches!(
                action,
                AgentAction::Move(Direction::South | Direction::West | Direction::East)
            ));
        }
    }

    #[test]
    fn boxed_in_agent_idles() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut world = open_world();
        for c in [Coord::new(1, 2), Coord::new(3, 2), Coord::new(2, 1), Coord::new(2, 3)] {
            world.set_resource(c, ResourceType::Obstacle).unwrap();
        }
        for energy in [10.0, 150.0] {
            let agent = make_agent(Coord::new(2, 2), energy);
            for _ in 0..20 {
                let action = choose_action(&agent, &world, &AgentConfig::default(), &mut rng);
                assert_eq!(action, AgentAction::Idle);
            }
        }
    }

    #[test]
    fn depleted_agent_always_idles_even_on_station() {
        let mut rng = SmallRng::seed_from_u64(4);
        let world = open_world();
        let agent = make_agent(Coord::new(0, 0), 0.0);
        assert_eq!(
            choose_action(&agent, &world, &AgentConfig::default(), &mut rng),
            AgentAction::Idle
        );
    }

    #[test]
    fn foraging_collects_often_when_possible() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut world = open_world();
        world.set_resource(Coord::new(2, 2), ResourceType::Ore).unwrap();
        let agent = make_agent(Coord::new(2, 2), 150.0);
        let collects = (0..1_000)
            .filter(|_| {
                choose_action(&agent, &world, &AgentConfig::default(), &mut rng)
                    == AgentAction::Collect
            })
            .count();
        assert!((500..700).contains(&collects), "collected {collects} times");
    }

    #[test]
    fn full_inventory_never_collects() {
        let mut rng = SmallRng::seed_from_u64(6);
        let mut world = open_world();
        world.set_resource(Coord::new(2, 2), ResourceType::Ore).unwrap();
        let mut agent = make_agent(Coord::new(2, 2), 150.0);
        agent.inventory.insert(ResourceType::Ore, 2);
        for _ in 0..200 {
            let action = choose_action(&agent, &world, &AgentConfig::default(), &mut rng);
            assert_ne!(action, AgentAction::Collect);
        }
    }
}
