//! Random world generation and agent start placement.
//!
//! Obstacles are scattered first, then each resource type in the key order
//! of the density map. Every scatter pass draws `area * density` random
//! coordinates and writes only onto cells that are still empty; collisions
//! are skipped, not retried. The charging station is forced last so that
//! scattering can never displace or duplicate it.

use std::collections::{BTreeMap, BTreeSet};

use knotworld_types::{Coord, ResourceType, SimulationSettings};
use rand::Rng;
use tracing::debug;

use crate::error::WorldError;
use crate::grid::GridWorld;

/// Lower bound on the number of rejection-sampling attempts used when
/// placing agents.
const MIN_PLACEMENT_ATTEMPTS: usize = 1_000;

/// Attempts allowed per grid cell when placing agents.
const PLACEMENT_ATTEMPTS_PER_CELL: usize = 100;

/// Inputs to [`generate_world`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Obstacle probability per cell.
    pub obstacle_density: f64,
    /// Placement density per resource type.
    pub resource_densities: BTreeMap<ResourceType, f64>,
    /// Location of the single charging station.
    pub charging_station: Coord,
}

impl GenerationParams {
    /// Extract the generation inputs from a settings record.
    pub fn from_settings(settings: &SimulationSettings) -> Self {
        Self {
            rows: settings.grid_rows,
            cols: settings.grid_cols,
            obstacle_density: settings.obstacle_density,
            resource_densities: settings.resource_densities.clone(),
            charging_station: settings.charging_station,
        }
    }
}

/// Number of placements a density asks for on a grid of `area` cells.
///
/// Non-finite or negative densities yield zero.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn scaled_count(area: usize, density: f64) -> usize {
    if !density.is_finite() || density <= 0.0 {
        return 0;
    }
    let raw = (area as f64 * density).floor();
    if raw >= area as f64 {
        area
    } else {
        raw as usize
    }
}

fn random_coord(rows: usize, cols: usize, rng: &mut impl Rng) -> Coord {
    Coord::new(rng.random_range(0..rows), rng.random_range(0..cols))
}

/// Draw `count` random cells and write `resource` onto those still empty.
/// Returns how many were actually placed.
fn scatter(world: &mut GridWorld, resource: ResourceType, count: usize, rng: &mut impl Rng) -> usize {
    let (rows, cols) = (world.rows(), world.cols());
    let station = world.charging_station();
    let mut placed: usize = 0;
    for _ in 0..count {
        let coord = random_coord(rows, cols, rng);
        if coord == station {
            continue;
        }
        match world.cell_mut(coord) {
            Some(cell) if cell.resource == ResourceType::Empty => {
                cell.resource = resource;
                placed = placed.saturating_add(1);
            }
            _ => {}
        }
    }
    placed
}

/// Build a new random world.
///
/// # Errors
///
/// Returns [`WorldError::InvalidDimensions`] or [`WorldError::OutOfBounds`]
/// when the grid shape or station coordinate is unusable.
pub fn generate_world(params: &GenerationParams, rng: &mut impl Rng) -> Result<GridWorld, WorldError> {
    let mut world = GridWorld::blank(params.rows, params.cols, params.charging_station)?;
    let area = world.area();

    let obstacles = scatter(
        &mut world,
        ResourceType::Obstacle,
        scaled_count(area, params.obstacle_density),
        rng,
    );

    for (&resource, &density) in &params.resource_densities {
        if !resource.is_collectible() {
            continue;
        }
        let placed = scatter(&mut world, resource, scaled_count(area, density), rng);
        debug!(resource = %resource, placed, "scattered resource");
    }

    world.force_charging_station();
    debug!(
        rows = world.rows(),
        cols = world.cols(),
        obstacles,
        station = %world.charging_station(),
        "world generated"
    );
    Ok(world)
}

/// Whether an agent may start on `coord`.
fn is_start_eligible(world: &GridWorld, coord: Coord) -> bool {
    coord != world.charging_station() && !world.is_blocked(coord)
}

/// Choose `count` distinct start cells for agents.
///
/// Start cells are never obstacles, never the charging station, and never
/// shared. Rejection sampling is bounded; if the grid cannot hold every
/// agent the call fails instead of looping.
///
/// # Errors
///
/// Returns [`WorldError::PlacementExhausted`] when there are fewer eligible
/// cells than agents, or when the attempt budget runs out.
pub fn pick_agent_starts(
    world: &GridWorld,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Coord>, WorldError> {
    let eligible = world
        .coords()
        .filter(|&c| is_start_eligible(world, c))
        .count();
    if eligible < count {
        return Err(WorldError::PlacementExhausted {
            requested: count,
            placed: 0,
            eligible,
        });
    }

    let budget = world
        .area()
        .saturating_mul(PLACEMENT_ATTEMPTS_PER_CELL)
        .max(MIN_PLACEMENT_ATTEMPTS);
    let mut claimed = BTreeSet::new();
    let mut starts = Vec::with_capacity(count);
    let mut attempts: usize = 0;

    while starts.len() < count {
        if attempts >= budget {
            return Err(WorldError::PlacementExhausted {
                requested: count,
                placed: starts.len(),
                eligible,
            });
        }
        attempts = attempts.saturating_add(1);
        let coord = random_coord(world.rows(), world.cols(), rng);
        if is_start_eligible(world, coord) && claimed.insert(coord) {
            starts.push(coord);
        }
    }
    Ok(starts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn params(rows: usize, cols: usize, obstacles: f64) -> GenerationParams {
        GenerationParams {
            rows,
            cols,
            obstacle_density: obstacles,
            resource_densities: knotworld_types::default_resource_densities(),
            charging_station: Coord::new(0, 0),
        }
    }

    #[test]
    fn scaled_count_floors_and_clamps() {
        assert_eq!(scaled_count(400, 0.05), 20);
        assert_eq!(scaled_count(10, 0.15), 1);
        assert_eq!(scaled_count(10, 3.0), 10);
        assert_eq!(scaled_count(10, -1.0), 0);
        assert_eq!(scaled_count(10, f64::NAN), 0);
    }

    #[test]
    fn exactly_one_station_regardless_of_density() {
        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut p = params(6, 6, 1.0);
            p.charging_station = Coord::new(3, 4);
            let world = generate_world(&p, &mut rng).unwrap();
            assert_eq!(world.count(ResourceType::ChargingStation), 1);
            assert_eq!(
                world.resource_at(Coord::new(3, 4)),
                Some(ResourceType::ChargingStation)
            );
        }
    }

    #[test]
    fn scatter_never_exceeds_request() {
        let mut rng = SmallRng::seed_from_u64(7);
        let world = generate_world(&params(20, 20, 0.05), &mut rng).unwrap();
        assert!(world.count(ResourceType::Obstacle) <= 20);
        assert!(world.count(ResourceType::Ore) <= 32);
        assert!(world.count(ResourceType::NewResource) <= 8);
        assert_eq!(world.boosted_count(), 0);
    }

    #[test]
    fn zero_densities_give_empty_world() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut p = params(5, 5, 0.0);
        p.resource_densities.clear();
        let world = generate_world(&p, &mut rng).unwrap();
        assert_eq!(world.count(ResourceType::Empty), 24);
    }

    #[test]
    fn non_collectible_density_keys_are_ignored() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut p = params(5, 5, 0.0);
        p.resource_densities = BTreeMap::from([(ResourceType::ChargingStation, 1.0)]);
        let world = generate_world(&p, &mut rng).unwrap();
        assert_eq!(world.count(ResourceType::ChargingStation), 1);
    }

    #[test]
    fn starts_are_distinct_and_eligible() {
        let mut rng = SmallRng::seed_from_u64(3);
        let world = generate_world(&params(8, 8, 0.2), &mut rng).unwrap();
        let starts = pick_agent_starts(&world, 10, &mut rng).unwrap();
        let unique: BTreeSet<_> = starts.iter().copied().collect();
        assert_eq!(unique.len(), 10);
        for coord in starts {
            assert!(!world.is_blocked(coord));
            assert_ne!(coord, world.charging_station());
        }
    }

    #[test]
    fn placement_fails_loudly_when_grid_is_full() {
        let mut rng = SmallRng::seed_from_u64(3);
        let world = GridWorld::new(1, 2, Coord::new(0, 0)).unwrap();
        let err = pick_agent_starts(&world, 2, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            WorldError::PlacementExhausted {
                requested: 2,
                eligible: 1,
                ..
            }
        ));
    }

    #[test]
    fn last_free_cell_is_found() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut world = GridWorld::new(3, 3, Coord::new(0, 0)).unwrap();
        for coord in world.coords().collect::<Vec<_>>() {
            if coord != Coord::new(0, 0) && coord != Coord::new(2, 2) {
                world.set_resource(coord, ResourceType::Obstacle).unwrap();
            }
        }
        let starts = pick_agent_starts(&world, 1, &mut rng).unwrap();
        assert_eq!(starts, vec![Coord::new(2, 2)]);
    }
}
