//! SQK effect lifecycle: plan, narrate, commit, decay.
//!
//! A knot with no effect running starts a new one in two phases. First
//! [`plan_effect`] draws the variant, duration, and mechanical details
//! without touching the world. Then, once narrative text is available
//! (or the fallback is chosen), [`PendingEffect::commit`] marks boosted
//! cells and yields the active [`SqkEffect`]. Every tick afterwards,
//! including the tick of creation, [`decay`] counts the duration down and
//! reverts the world changes on expiry.

use knotworld_types::{
    Agent, AgentId, Coord, EffectDetails, EffectKind, KnotEvent, SpeedTarget, SqkEffect,
};
use knotworld_world::GridWorld;
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, info};

/// Random draws per boost slot before the slot is given up.
pub const BOOST_ATTEMPTS_PER_SLOT: usize = 10;

/// Chance that a speed boost targets every agent.
pub const SPEED_BOOST_ALL_PROBABILITY: f64 = 0.3;

/// Effect tuning constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParams {
    /// Shortest duration in ticks.
    pub duration_min: u32,
    /// Longest duration in ticks (inclusive).
    pub duration_max: u32,
    /// Lower bound of the speed multiplier.
    pub speed_boost_min: f64,
    /// Upper bound of the speed multiplier.
    pub speed_boost_max: f64,
}

impl EffectParams {
    /// Extract the effect constants from a settings record.
    pub const fn from_settings(settings: &knotworld_types::SimulationSettings) -> Self {
        Self {
            duration_min: settings.sqk_effect_duration_min,
            duration_max: settings.sqk_effect_duration_max,
            speed_boost_min: settings.sqk_speed_boost_multiplier_min,
            speed_boost_max: settings.sqk_speed_boost_multiplier_max,
        }
    }
}

/// A planned effect awaiting its narrative.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEffect {
    /// The knot that triggered the effect.
    pub knot: KnotEvent,
    /// Variant and mechanical parameters.
    pub details: EffectDetails,
    /// Duration the effect will start with.
    pub duration: u32,
}

impl PendingEffect {
    /// The variant tag.
    pub const fn kind(&self) -> EffectKind {
        self.details.kind()
    }

    /// Apply the world-side changes and produce the active effect.
    ///
    /// Only cells that were actually marked stay in the boosted list.
    pub fn commit(mut self, world: &mut GridWorld, narrative: String) -> SqkEffect {
        if let EffectDetails::ResourceBoost { boosted_cells } = &mut self.details {
            boosted_cells.retain(|&coord| world.set_boosted(coord, true));
        }
        info!(
            kind = %self.kind(),
            duration = self.duration,
            knot_tick = self.knot.tick,
            "sqk effect started"
        );
        SqkEffect {
            details: self.details,
            remaining_duration: self.duration,
            narrative: Some(narrative),
        }
    }
}

/// Narrative text used when the collaborator is absent or fails.
pub fn fallback_narrative(kind: EffectKind) -> String {
    format!("Event: {kind}")
}

/// Number of cells a resource boost tries to mark on a grid with `cols`
/// columns: `floor(u * cols / 4) + ceil(cols / 5)`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn boost_target_count(cols: usize, u: f64) -> usize {
    let spread = (u.clamp(0.0, 1.0) * cols as f64 / 4.0).floor() as usize;
    spread.saturating_add(cols.div_ceil(5))
}

fn pick_boosted_cells(world: &GridWorld, rng: &mut impl Rng) -> Vec<Coord> {
    let target = boost_target_count(world.cols(), rng.random::<f64>());
    let mut cells: Vec<Coord> = Vec::with_capacity(target);
    for _ in 0..target {
        for _ in 0..BOOST_ATTEMPTS_PER_SLOT {
            let coord = Coord::new(
                rng.random_range(0..world.rows()),
                rng.random_range(0..world.cols()),
            );
            let collectible = world.resource_at(coord).is_some_and(|r| r.is_collectible());
            if collectible && !cells.contains(&coord) {
                cells.push(coord);
                break;
            }
        }
    }
    cells
}

/// Speed multiplier drawn uniformly from `[min, max]`, rounded to one
/// decimal.
pub fn draw_multiplier(params: &EffectParams, rng: &mut impl Rng) -> f64 {
    let (lo, hi) = (params.speed_boost_min, params.speed_boost_max);
    let raw = if hi > lo { rng.random_range(lo..=hi) } else { lo };
    (raw * 10.0).round() / 10.0
}

fn pick_speed_target(agents: &[Agent], rng: &mut impl Rng) -> SpeedTarget {
    if rng.random_bool(SPEED_BOOST_ALL_PROBABILITY) {
        return SpeedTarget::All;
    }
    agents
        .choose(rng)
        .map_or(SpeedTarget::All, |a| SpeedTarget::Agent(a.id))
}

/// Draw a new effect for `knot`. Does not modify the world.
pub fn plan_effect(
    knot: KnotEvent,
    world: &GridWorld,
    agents: &[Agent],
    params: &EffectParams,
    rng: &mut impl Rng,
) -> PendingEffect {
    let kind = EffectKind::ALL
        .choose(rng)
        .copied()
        .unwrap_or(EffectKind::GoalReveal);
    let duration = if params.duration_max > params.duration_min {
        rng.random_range(params.duration_min..=params.duration_max)
    } else {
        params.duration_min
    }
    .max(1);

    let details = match kind {
        EffectKind::ResourceBoost => EffectDetails::ResourceBoost {
            boosted_cells: pick_boosted_cells(world, rng),
        },
        EffectKind::AgentSpeedBoost => EffectDetails::AgentSpeedBoost {
            target: pick_speed_target(agents, rng),
            multiplier: draw_multiplier(params, rng),
        },
        EffectKind::GoalReveal => EffectDetails::GoalReveal,
    };
    debug!(kind = %kind, duration, "sqk effect planned");
    PendingEffect {
        knot,
        details,
        duration,
    }
}

/// Result of one decay step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decay {
    /// No effect was active.
    Idle,
    /// The effect is still running with this many ticks left.
    Running(u32),
    /// The effect expired this tick.
    Expired(EffectKind),
}

/// Count the active effect down by one tick, clearing it at zero.
///
/// On expiry of a resource boost every cell it marked is un-boosted in the
/// same call.
pub fn decay(active: &mut Option<SqkEffect>, world: &mut GridWorld) -> Decay {
    let Some(effect) = active.as_mut() else {
        return Decay::Idle;
    };
    effect.remaining_duration = effect.remaining_duration.saturating_sub(1);
    if effect.remaining_duration > 0 {
        return Decay::Running(effect.remaining_duration);
    }
    let kind = effect.kind();
    if let EffectDetails::ResourceBoost { boosted_cells } = &effect.details {
        world.clear_boosts(boosted_cells);
    }
    *active = None;
    info!(kind = %kind, "sqk effect expired");
    Decay::Expired(kind)
}

/// Which agents an effect affects, for logging and summaries.
pub fn affected_agents(effect: &SqkEffect, agents: &[Agent]) -> Vec<AgentId> {
    agents
        .iter()
        .filter(|a| effect.speed_multiplier_for(a.id).is_some())
        .map(|a| a.id)
        .collect()
}
