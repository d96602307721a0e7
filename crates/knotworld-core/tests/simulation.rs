//! End-to-end tests for the `knotworld-core` tick orchestrator.
//!
//! These drive whole simulations through [`Simulation::advance`] and check
//! the invariants that must hold after every tick.

// Integration tests use unwrap extensively for clarity -- panicking on
// failure is the correct behavior in test code.
#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::float_cmp
)]

use std::collections::BTreeMap;
use std::future::Future;

use knotworld_core::{
    NarrativeError, NarrativeRequest, NarrativeSource, Simulation, SimulationError,
    StubNarrativeSource,
};
use knotworld_types::{
    Agent, AgentAction, AgentId, Coord, EffectDetails, ResourceType, SimulationSettings,
};
use knotworld_world::GridWorld;

// =============================================================================
// Helpers
// =============================================================================

fn barren_densities() -> BTreeMap<ResourceType, f64> {
    [
        ResourceType::Ore,
        ResourceType::Tree,
        ResourceType::Water,
        ResourceType::Plant,
        ResourceType::NewResource,
    ]
    .into_iter()
    .map(|r| (r, 0.0))
    .collect()
}

/// Identical noise-free channels and a low threshold: knots fire on every
/// tick where the wave sits above 0.5.
fn resonant_settings(seed: u64) -> SimulationSettings {
    SimulationSettings {
        grid_rows: 10,
        grid_cols: 10,
        num_agents: 3,
        sqs_noise_factor: 0.0,
        sqs_f_energy: 0.01,
        sqs_f_phase: 0.01,
        sqs_threshold_s: 0.5,
        sqs_decimal_precision: 0,
        sqk_effect_duration_min: 3,
        sqk_effect_duration_max: 8,
        resource_respawn_rate: 0.5,
        seed: Some(seed),
        ..SimulationSettings::default()
    }
}

struct Poet;

impl NarrativeSource for Poet {
    fn narrate(
        &self,
        request: &NarrativeRequest,
    ) -> impl Future<Output = Result<String, NarrativeError>> + Send {
        let text = format!("The lattice tightens around {}.", request.kind);
        std::future::ready(Ok(text))
    }
}

// =============================================================================
// Depletion scenario
// =============================================================================

#[tokio::test]
async fn lone_agent_runs_dry_after_two_hundred_ticks() {
    let settings = SimulationSettings {
        grid_rows: 5,
        grid_cols: 5,
        num_agents: 1,
        initial_energy: 200.0,
        energy_depletion_rate: 1.0,
        low_energy_threshold: 0.0,
        obstacle_density: 0.0,
        resource_densities: barren_densities(),
        resource_respawn_rate: 0.0,
        sqs_threshold_s: 2.0,
        seed: Some(2024),
        ..SimulationSettings::default()
    };
    let mut sim = Simulation::new(settings).unwrap();
    let narrator = StubNarrativeSource::new();

    for tick in 1..=200_u64 {
        let summary = sim.advance(&narrator).await;
        assert!(summary.knot.is_none());
        assert!(summary.respawn.is_none());
        let agent = sim.agents().first().unwrap();
        assert_eq!(agent.energy, 200.0 - f64::from(u32::try_from(tick).unwrap()));
    }
    let frozen_at = sim.agents().first().unwrap().position;
    assert_eq!(sim.agents().first().unwrap().energy, 0.0);

    for _ in 0..50 {
        let summary = sim.advance(&narrator).await;
        let entry = summary.agents.first().unwrap();
        assert_eq!(entry.action, AgentAction::Idle);
        assert_eq!(entry.energy, 0.0);
        assert_eq!(entry.position, frozen_at);
        assert_eq!(summary.active_agents(), 0);
    }
    assert_eq!(sim.tick(), 250);
    assert!(sim.active_effect().is_none());
}

#[tokio::test]
async fn depleted_agent_on_station_stays_frozen() {
    let settings = SimulationSettings {
        grid_rows: 3,
        grid_cols: 3,
        num_agents: 1,
        resource_densities: barren_densities(),
        resource_respawn_rate: 0.0,
        sqs_threshold_s: 2.0,
        seed: Some(5),
        ..SimulationSettings::default()
    };
    let world = GridWorld::new(3, 3, Coord::new(0, 0)).unwrap();
    let agent = Agent {
        id: AgentId::new(0),
        position: Coord::new(0, 0),
        energy: 0.0,
        inventory: BTreeMap::new(),
        speed: 1,
        carry_capacity: 2,
    };
    let mut sim = Simulation::from_parts(settings, world, vec![agent]).unwrap();
    for _ in 0..20 {
        sim.advance(&StubNarrativeSource::new()).await;
    }
    let agent = sim.agents().first().unwrap();
    assert_eq!(agent.energy, 0.0);
    assert_eq!(agent.position, Coord::new(0, 0));
}

// =============================================================================
// Invariants over a busy run
// =============================================================================

#[tokio::test]
async fn invariants_hold_every_tick() {
    let settings = resonant_settings(77);
    let initial_energy = settings.initial_energy;
    let mut sim = Simulation::new(settings).unwrap();
    let narrator = StubNarrativeSource::new();

    let mut started = 0_u32;
    let mut previous_remaining: Option<u32> = None;

    for _ in 0..1_500 {
        let summary = sim.advance(&narrator).await;
        let world = sim.world();

        assert_eq!(world.count(ResourceType::ChargingStation), 1);
        assert_eq!(
            world.resource_at(world.charging_station()),
            Some(ResourceType::ChargingStation)
        );

        for agent in sim.agents() {
            assert!(world.in_bounds(agent.position));
            assert!(!world.is_blocked(agent.position));
            assert!((0.0..=initial_energy).contains(&agent.energy));
            for (&resource, &held) in &agent.inventory {
                assert!(resource.is_collectible());
                assert!(held <= agent.carry_capacity);
            }
        }

        if summary.effect_started.is_some() {
            started = started.saturating_add(1);
            assert!(previous_remaining.is_none(), "effect started over another");
        } else if let (Some(before), Some(now)) = (previous_remaining, summary.effect_remaining) {
            assert!(now < before, "remaining duration must strictly decrease");
        }
        if summary.effect_expired.is_some() {
            assert!(sim.active_effect().is_none());
        }

        match sim.active_effect().map(|e| &e.details) {
            Some(EffectDetails::ResourceBoost { boosted_cells }) => {
                // Collected cells lose their boost early.
                assert!(world.boosted_count() <= boosted_cells.len());
                for coord in world.coords() {
                    if world.cell(coord).is_some_and(|c| c.is_boosted) {
                        assert!(boosted_cells.contains(&coord));
                    }
                }
            }
            _ => assert_eq!(world.boosted_count(), 0),
        }

        previous_remaining = summary.effect_remaining;
    }

    assert!(started > 0, "resonant settings should start effects");
    assert!(sim.subquantum().knot_history.len() <= 21);
}

#[tokio::test]
async fn narrated_effects_carry_source_text() {
    let mut sim = Simulation::new(resonant_settings(3)).unwrap();
    for _ in 0..500 {
        let summary = sim.advance(&Poet).await;
        if summary.effect_started.is_some() {
            assert!(summary.narrated);
            let effect = sim.active_effect().unwrap();
            let text = effect.narrative.as_deref().unwrap();
            assert!(text.starts_with("The lattice tightens around"));
            return;
        }
    }
    panic!("no effect started in 500 ticks");
}

#[tokio::test]
async fn seeded_runs_are_reproducible() {
    let mut a = Simulation::new(resonant_settings(11)).unwrap();
    let mut b = Simulation::new(resonant_settings(11)).unwrap();
    for _ in 0..300 {
        let left = a.advance(&StubNarrativeSource::new()).await;
        let right = b.advance(&StubNarrativeSource::new()).await;
        assert_eq!(left, right);
    }
    assert_eq!(a.snapshot(), b.snapshot());
}

// =============================================================================
// Construction boundary
// =============================================================================

#[test]
fn non_finite_settings_never_reach_advance() {
    let nan_energy = SimulationSettings {
        initial_energy: f64::NAN,
        ..SimulationSettings::default()
    };
    let unbounded_boost = SimulationSettings {
        sqk_speed_boost_multiplier_max: f64::INFINITY,
        ..resonant_settings(5)
    };
    for settings in [nan_energy, unbounded_boost] {
        assert!(matches!(
            Simulation::new(settings),
            Err(SimulationError::Config { .. })
        ));
    }
}

#[tokio::test]
async fn wide_speed_boost_range_runs_cleanly() {
    let settings = SimulationSettings {
        sqk_speed_boost_multiplier_min: 1.0,
        sqk_speed_boost_multiplier_max: 1.0e6,
        ..resonant_settings(5)
    };
    let mut sim = Simulation::new(settings).unwrap();
    let mut started = 0_u32;
    for _ in 0..400 {
        let summary = sim.advance(&StubNarrativeSource::new()).await;
        if summary.effect_started.is_some() {
            started = started.saturating_add(1);
        }
        for agent in sim.agents() {
            assert!(agent.energy.is_finite());
        }
    }
    assert!(started > 0);
}
