//! Core entity structs for the Knotworld simulation.
//!
//! Grid cells, agents, oscillator knot records, and SQK effects. These are
//! plain data; the mechanics that mutate them live in the world, agents,
//! and core crates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EffectKind, ResourceType};
use crate::ids::AgentId;

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// A grid coordinate. Row 0 is the top (north) edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coord {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

impl Coord {
    /// Build a coordinate from a row and column.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl core::fmt::Display for Coord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One cell of the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GridCell {
    /// What occupies the cell.
    pub resource: ResourceType,
    /// Set while a resource-boost effect targets this cell.
    pub is_boosted: bool,
}

impl GridCell {
    /// An unboosted cell holding `resource`.
    pub const fn new(resource: ResourceType) -> Self {
        Self {
            resource,
            is_boosted: false,
        }
    }

    /// An unboosted empty cell.
    pub const fn empty() -> Self {
        Self::new(ResourceType::Empty)
    }
}

impl Default for GridCell {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Mutable state of a single foraging agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Agent {
    /// Stable id, assigned in spawn order.
    pub id: AgentId,
    /// Current cell.
    pub position: Coord,
    /// Current energy, always within `[0, initial_energy]`.
    pub energy: f64,
    /// Collected resources by type.
    pub inventory: BTreeMap<ResourceType, u32>,
    /// Cells moved per directional action without a speed boost.
    pub speed: u32,
    /// Maximum count held per resource type.
    pub carry_capacity: u32,
}

impl Agent {
    /// How many units of `resource` the agent holds.
    pub fn held(&self, resource: ResourceType) -> u32 {
        self.inventory.get(&resource).copied().unwrap_or(0)
    }

    /// Whether the agent has run out of energy.
    ///
    /// A depleted agent takes no further state-changing actions.
    pub fn is_depleted(&self) -> bool {
        self.energy <= 0.0
    }
}

// ---------------------------------------------------------------------------
// SubQuantum system
// ---------------------------------------------------------------------------

/// A recorded coupling ("knot") between the two oscillator channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct KnotEvent {
    /// Absolute simulation time at which the knot fired.
    pub tick: u64,
    /// Energy channel value at the knot.
    pub energy_value: f64,
    /// Phase channel value at the knot.
    pub phase_value: f64,
    /// Projected `Re(s)` scalar in `[0.01, 0.99]`.
    pub projected_res: f64,
}

/// Observable state of the two-oscillator detector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SubQuantumState {
    /// Current energy channel value in `[0, 1.5]`.
    pub energy_wave: f64,
    /// Current phase channel value in `[0, 1.5]`.
    pub phase_wave: f64,
    /// Whether this tick's wave values satisfy the communication predicate.
    pub communication_conducive: bool,
    /// Recent knots, oldest first, at most 21 entries.
    pub knot_history: Vec<KnotEvent>,
}

impl SubQuantumState {
    /// The most recent knot, if any fired yet.
    pub fn last_knot(&self) -> Option<&KnotEvent> {
        self.knot_history.last()
    }
}

// ---------------------------------------------------------------------------
// SQK effects
// ---------------------------------------------------------------------------

/// Which agents a speed boost applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SpeedTarget {
    /// Every agent.
    All,
    /// A single agent.
    Agent(AgentId),
}

impl SpeedTarget {
    /// Whether the boost applies to `agent`.
    pub fn includes(self, agent: AgentId) -> bool {
        match self {
            Self::All => true,
            Self::Agent(id) => id == agent,
        }
    }
}

/// Variant-specific payload of an SQK effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EffectDetails {
    /// Collecting from one of these cells grants bonus energy.
    ResourceBoost {
        /// Cells marked as boosted while the effect runs.
        boosted_cells: Vec<Coord>,
    },
    /// Targeted agents move `floor(base_speed * multiplier)` cells per step.
    AgentSpeedBoost {
        /// Affected agents.
        target: SpeedTarget,
        /// Speed multiplier, rounded to one decimal.
        multiplier: f64,
    },
    /// Narrative-only event with no mechanical side effect.
    GoalReveal,
}

impl EffectDetails {
    /// The variant tag.
    pub const fn kind(&self) -> EffectKind {
        match self {
            Self::ResourceBoost { .. } => EffectKind::ResourceBoost,
            Self::AgentSpeedBoost { .. } => EffectKind::AgentSpeedBoost,
            Self::GoalReveal => EffectKind::GoalReveal,
        }
    }
}

/// A temporary global modifier triggered by a knot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SqkEffect {
    /// Variant and mechanical parameters.
    pub details: EffectDetails,
    /// Ticks left before expiry.
    pub remaining_duration: u32,
    /// Flavor text from the narrative collaborator, or the fallback text.
    pub narrative: Option<String>,
}

impl SqkEffect {
    /// The variant tag.
    pub const fn kind(&self) -> EffectKind {
        self.details.kind()
    }

    /// The speed multiplier that applies to `agent`, if this is a speed
    /// boost targeting it.
    pub fn speed_multiplier_for(&self, agent: AgentId) -> Option<f64> {
        match self.details {
            EffectDetails::AgentSpeedBoost { target, multiplier } if target.includes(agent) => {
                Some(multiplier)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_agent(energy: f64) -> Agent {
        Agent {
            id: AgentId::new(0),
            position: Coord::new(1, 1),
            energy,
            inventory: BTreeMap::new(),
            speed: 1,
            carry_capacity: 2,
        }
    }

    #[test]
    fn held_defaults_to_zero() {
        let mut agent = make_agent(10.0);
        assert_eq!(agent.held(ResourceType::Ore), 0);
        agent.inventory.insert(ResourceType::Ore, 2);
        assert_eq!(agent.held(ResourceType::Ore), 2);
    }

    #[test]
    fn depletion_is_zero_energy() {
        assert!(make_agent(0.0).is_depleted());
        assert!(!make_agent(0.5).is_depleted());
    }

    #[test]
    fn speed_target_matching() {
        let boost = SqkEffect {
            details: EffectDetails::AgentSpeedBoost {
                target: SpeedTarget::Agent(AgentId::new(1)),
                multiplier: 1.5,
            },
            remaining_duration: 3,
            narrative: None,
        };
        assert_eq!(boost.speed_multiplier_for(AgentId::new(1)), Some(1.5));
        assert_eq!(boost.speed_multiplier_for(AgentId::new(0)), None);
        assert!(SpeedTarget::All.includes(AgentId::new(9)));
    }

    #[test]
    fn effect_details_serialize_with_kind_tag() {
        let details = EffectDetails::ResourceBoost {
            boosted_cells: vec![Coord::new(2, 3)],
        };
        let json = serde_json::to_value(&details).unwrap_or_default();
        assert_eq!(json["kind"], "resource_boost");
        assert_eq!(json["boosted_cells"][0]["row"], 2);
        assert_eq!(details.kind(), EffectKind::ResourceBoost);
    }
}
