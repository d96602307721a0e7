//! Occasional resource respawn onto empty cells.
//!
//! Once per tick, with probability `rate * rows * cols * 0.1` (clamped to
//! `[0, 1]`), one uniformly chosen empty cell that no agent stands on is
//! converted to a uniformly chosen configured resource type.

use std::collections::BTreeSet;

use knotworld_types::{Coord, ResourceType};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::grid::GridWorld;

/// Scale applied to `rate * area` to get the per-tick probability.
const RESPAWN_AREA_SCALE: f64 = 0.1;

/// Per-tick probability that a resource respawns.
#[allow(clippy::cast_precision_loss)]
pub fn respawn_probability(rate: f64, rows: usize, cols: usize) -> f64 {
    let p = rate * rows as f64 * cols as f64 * RESPAWN_AREA_SCALE;
    if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
}

/// Roll for a respawn and apply it.
///
/// `occupied` holds the agent positions; `types` the resource types that
/// may respawn (non-collectible entries are ignored). Returns the cell and
/// the resource placed, if a respawn happened.
pub fn maybe_respawn(
    world: &mut GridWorld,
    occupied: &BTreeSet<Coord>,
    types: &[ResourceType],
    rate: f64,
    rng: &mut impl Rng,
) -> Option<(Coord, ResourceType)> {
    let probability = respawn_probability(rate, world.rows(), world.cols());
    if probability <= 0.0 || !rng.random_bool(probability) {
        return None;
    }

    let candidates: Vec<ResourceType> = types
        .iter()
        .copied()
        .filter(|r| r.is_collectible())
        .collect();
    let free: Vec<Coord> = world
        .coords()
        .filter(|c| {
            !occupied.contains(c) && world.resource_at(*c) == Some(ResourceType::Empty)
        })
        .collect();

    let coord = *free.choose(rng)?;
    let resource = *candidates.choose(rng)?;
    world.set_resource(coord, resource).ok()?;
    debug!(cell = %coord, resource = %resource, "resource respawned");
    Some((coord, resource))
}
