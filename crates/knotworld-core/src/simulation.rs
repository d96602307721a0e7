//! The simulation orchestrator.
//!
//! A [`Simulation`] exclusively owns one grid, its agents, one
//! SubQuantum System, at most one active SQK effect, and the RNG that
//! drives them. [`Simulation::advance`] runs one tick to completion:
//!
//! 1. Sample the oscillators at the current simulation time.
//! 2. If a knot fired and no effect is active, plan an effect, await its
//!    narrative, and commit it. A knot during a running effect is ignored.
//! 3. Decay the active effect (a new effect decays in its first tick too).
//! 4. Every agent chooses an action against the post-decay world.
//! 5. Actions resolve in ascending id order.
//! 6. Roll for a resource respawn.
//! 7. Advance the tick counter and simulation time.
//!
//! The only suspension point is the narrative request in step 2.

use std::collections::BTreeSet;
use std::time::Duration;

use knotworld_agents::{
    ActionOutcome, AgentConfig, AgentError, choose_action, resolve_action, spawn_agents,
};
use knotworld_types::{
    Agent, AgentAction, AgentId, Coord, EffectKind, KnotEvent, ResourceType, SimulationSettings,
    SimulationSnapshot, SqkEffect, SubQuantumState,
};
use knotworld_world::{GenerationParams, GridWorld, WorldError, generate_world, maybe_respawn};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{self, ConfigError};
use crate::effect::{self, Decay, EffectParams};
use crate::narrative::{NarrativeRequest, NarrativeSource, narrate_with_fallback};
use crate::subquantum::{SqsParams, SubQuantumSystem};

/// Errors that can occur while building a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The settings failed validation.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// World generation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// Agent placement failed.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// A supplied agent stands somewhere it cannot.
    #[error("agent {agent} cannot stand on {position}")]
    InvalidAgentPosition {
        /// The offending agent.
        agent: AgentId,
        /// Its position.
        position: Coord,
    },

    /// A supplied agent's state breaks the agent invariants.
    #[error("invalid agent {agent}: {reason}")]
    InvalidAgent {
        /// The offending agent.
        agent: AgentId,
        /// What is wrong with it.
        reason: String,
    },
}

/// Check one supplied agent against the world and the settings.
fn check_agent(
    agent: &Agent,
    world: &GridWorld,
    settings: &SimulationSettings,
) -> Result<(), SimulationError> {
    let invalid = |reason: String| SimulationError::InvalidAgent {
        agent: agent.id,
        reason,
    };
    if world.is_blocked(agent.position) {
        return Err(SimulationError::InvalidAgentPosition {
            agent: agent.id,
            position: agent.position,
        });
    }
    if !(0.0..=settings.initial_energy).contains(&agent.energy) {
        return Err(invalid(format!(
            "energy {} is outside [0, {}]",
            agent.energy, settings.initial_energy
        )));
    }
    for (&resource, &count) in &agent.inventory {
        if !resource.is_collectible() {
            return Err(invalid(format!("holds {resource}, which is not collectible")));
        }
        if count > agent.carry_capacity {
            return Err(invalid(format!(
                "holds {count} {resource}, over the carry capacity of {}",
                agent.carry_capacity
            )));
        }
    }
    Ok(())
}

/// What one agent did in a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentTick {
    /// The agent.
    pub agent: AgentId,
    /// The chosen action.
    pub action: AgentAction,
    /// What the action did.
    pub outcome: ActionOutcome,
    /// Position after resolution.
    pub position: Coord,
    /// Energy after depletion.
    pub energy: f64,
}

/// A resource that reappeared on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Respawn {
    /// Where it appeared.
    pub cell: Coord,
    /// What appeared.
    pub resource: ResourceType,
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSummary {
    /// Number of completed ticks after this one.
    pub tick: u64,
    /// Simulation time the oscillators were sampled at.
    pub sampled_at: u64,
    /// Energy channel value this tick.
    pub energy_wave: f64,
    /// Phase channel value this tick.
    pub phase_wave: f64,
    /// Whether the communication predicate held this tick.
    pub communication_conducive: bool,
    /// The knot that fired this tick, if any.
    pub knot: Option<KnotEvent>,
    /// Whether a knot fired while an effect was already running.
    pub knot_ignored: bool,
    /// Variant of the effect started this tick.
    pub effect_started: Option<EffectKind>,
    /// Whether the started effect's text came from the narrative source.
    pub narrated: bool,
    /// Variant of the effect that expired this tick.
    pub effect_expired: Option<EffectKind>,
    /// Ticks left on the active effect after decay.
    pub effect_remaining: Option<u32>,
    /// Per-agent actions in resolution order.
    pub agents: Vec<AgentTick>,
    /// Resource respawned this tick.
    pub respawn: Option<Respawn>,
}

impl TickSummary {
    /// Number of agents with energy left after this tick.
    pub fn active_agents(&self) -> usize {
        self.agents.iter().filter(|a| a.energy > 0.0).count()
    }
}

/// One running simulation.
#[derive(Debug)]
pub struct Simulation {
    settings: SimulationSettings,
    agent_config: AgentConfig,
    effect_params: EffectParams,
    world: GridWorld,
    agents: Vec<Agent>,
    sqs: SubQuantumSystem,
    active_effect: Option<SqkEffect>,
    tick: u64,
    simulation_time: u64,
    narrative_timeout: Option<Duration>,
    rng: SmallRng,
}

impl Simulation {
    /// Build a new simulation with a randomly generated world.
    ///
    /// The RNG is seeded from `settings.seed` when set, otherwise from the
    /// OS.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] for invalid settings and
    /// [`SimulationError::Agent`] when agents cannot be placed.
    pub fn new(settings: SimulationSettings) -> Result<Self, SimulationError> {
        config::validate(&settings)?;
        let mut rng = settings
            .seed
            .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
        let world = generate_world(&GenerationParams::from_settings(&settings), &mut rng)?;
        let agent_config = AgentConfig::from_settings(&settings);
        let count = usize::try_from(settings.num_agents).unwrap_or(usize::MAX);
        let agents = spawn_agents(&world, &agent_config, count, &mut rng)?;
        let sim = Self::assemble(settings, world, agents, rng);
        info!(
            rows = sim.world.rows(),
            cols = sim.world.cols(),
            agents = sim.agents.len(),
            seed = ?sim.settings.seed,
            "simulation created"
        );
        Ok(sim)
    }

    /// Build a simulation around a prepared world and agent list.
    ///
    /// Agents are re-sorted by id.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] for invalid settings or a grid
    /// that does not match them,
    /// [`SimulationError::InvalidAgentPosition`] for agents out of bounds
    /// or on obstacles, and [`SimulationError::InvalidAgent`] for duplicate
    /// ids, energy outside `[0, initial_energy]`, or over-full inventories.
    pub fn from_parts(
        settings: SimulationSettings,
        world: GridWorld,
        mut agents: Vec<Agent>,
    ) -> Result<Self, SimulationError> {
        config::validate(&settings)?;
        if world.rows() != settings.grid_rows
            || world.cols() != settings.grid_cols
            || world.charging_station() != settings.charging_station
        {
            return Err(ConfigError::Invalid {
                field: "grid",
                reason: "world shape does not match settings".to_owned(),
            }
            .into());
        }
        for agent in &agents {
            check_agent(agent, &world, &settings)?;
        }
        agents.sort_by_key(|a| a.id);
        if let Some(dup) = agents.windows(2).find_map(|pair| match pair {
            [a, b] if a.id == b.id => Some(a.id),
            _ => None,
        }) {
            return Err(SimulationError::InvalidAgent {
                agent: dup,
                reason: "duplicate id".to_owned(),
            });
        }
        let rng = settings
            .seed
            .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
        Ok(Self::assemble(settings, world, agents, rng))
    }

    fn assemble(
        settings: SimulationSettings,
        world: GridWorld,
        agents: Vec<Agent>,
        mut rng: SmallRng,
    ) -> Self {
        let mut sqs = SubQuantumSystem::new(SqsParams::from_settings(&settings));
        sqs.update(0, &mut rng);
        Self {
            agent_config: AgentConfig::from_settings(&settings),
            effect_params: EffectParams::from_settings(&settings),
            settings,
            world,
            agents,
            sqs,
            active_effect: None,
            tick: 0,
            simulation_time: 0,
            narrative_timeout: None,
            rng,
        }
    }

    /// Bound every narrative request by `timeout`. `None` (the default)
    /// waits however long the source takes.
    #[must_use]
    pub const fn with_narrative_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.narrative_timeout = timeout;
        self
    }

    /// The narrative timeout in force.
    pub const fn narrative_timeout(&self) -> Option<Duration> {
        self.narrative_timeout
    }

    /// Run one tick.
    pub async fn advance<N: NarrativeSource>(&mut self, narrator: &N) -> TickSummary {
        let sampled_at = self.simulation_time;
        let knot = self.sqs.update(sampled_at, &mut self.rng);

        let mut knot_ignored = false;
        let mut effect_started = None;
        let mut narrated = false;
        if let Some(knot) = knot {
            if self.active_effect.is_none() {
                let pending = effect::plan_effect(
                    knot,
                    &self.world,
                    &self.agents,
                    &self.effect_params,
                    &mut self.rng,
                );
                let request = NarrativeRequest::from_pending(&pending);
                let (text, from_source) =
                    narrate_with_fallback(narrator, &request, self.narrative_timeout).await;
                effect_started = Some(pending.kind());
                narrated = from_source;
                self.active_effect = Some(pending.commit(&mut self.world, text));
            } else {
                knot_ignored = true;
                debug!(tick = self.tick, "knot ignored while an effect is active");
            }
        }

        let decay = effect::decay(&mut self.active_effect, &mut self.world);
        let effect_expired = match decay {
            Decay::Expired(kind) => Some(kind),
            Decay::Idle | Decay::Running(_) => None,
        };

        let actions: Vec<AgentAction> = self
            .agents
            .iter()
            .map(|agent| choose_action(agent, &self.world, &self.agent_config, &mut self.rng))
            .collect();

        let active = self.active_effect.as_ref();
        let mut agent_ticks = Vec::with_capacity(self.agents.len());
        for (agent, action) in self.agents.iter_mut().zip(actions) {
            let outcome = resolve_action(agent, action, &mut self.world, &self.agent_config, active);
            agent_ticks.push(AgentTick {
                agent: agent.id,
                action,
                outcome,
                position: agent.position,
                energy: agent.energy,
            });
        }

        let occupied: BTreeSet<Coord> = self.agents.iter().map(|a| a.position).collect();
        let respawn_types: Vec<ResourceType> =
            self.settings.resource_densities.keys().copied().collect();
        let respawn = maybe_respawn(
            &mut self.world,
            &occupied,
            &respawn_types,
            self.settings.resource_respawn_rate,
            &mut self.rng,
        )
        .map(|(cell, resource)| Respawn { cell, resource });

        self.tick = self.tick.saturating_add(1);
        self.simulation_time = self.simulation_time.saturating_add(1);

        let summary = TickSummary {
            tick: self.tick,
            sampled_at,
            energy_wave: self.sqs.energy_wave(),
            phase_wave: self.sqs.phase_wave(),
            communication_conducive: self.sqs.communication_conducive(),
            knot,
            knot_ignored,
            effect_started,
            narrated,
            effect_expired,
            effect_remaining: self.active_effect.as_ref().map(|e| e.remaining_duration),
            agents: agent_ticks,
            respawn,
        };
        debug!(
            tick = summary.tick,
            knot = summary.knot.is_some(),
            active_agents = summary.active_agents(),
            "tick complete"
        );
        summary
    }

    /// An owned copy of the observable state.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            grid: self.world.to_rows(),
            agents: self.agents.clone(),
            subquantum: self.sqs.state(),
            active_effect: self.active_effect.clone(),
            tick: self.tick,
            simulation_time: self.simulation_time,
            settings: self.settings.clone(),
        }
    }

    /// Settings the simulation was built with.
    pub const fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// The grid.
    pub const fn world(&self) -> &GridWorld {
        &self.world
    }

    /// Agents in ascending id order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// The agent with the given id.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// The active SQK effect.
    pub const fn active_effect(&self) -> Option<&SqkEffect> {
        self.active_effect.as_ref()
    }

    /// Current oscillator state.
    pub fn subquantum(&self) -> SubQuantumState {
        self.sqs.state()
    }

    /// Number of completed ticks.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Time the oscillators will be sampled at on the next tick.
    pub const fn simulation_time(&self) -> u64 {
        self.simulation_time
    }
}
