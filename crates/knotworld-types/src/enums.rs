//! Enumeration types for the Knotworld simulation.
//!
//! Cell contents, effect variants, and the per-tick action vocabulary of
//! agents.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Resource types
// ---------------------------------------------------------------------------

/// What occupies a grid cell.
///
/// The declaration order is significant: resource densities are stored in
/// a `BTreeMap<ResourceType, f64>` and scattered in this order during world
/// generation, so later types may claim cells earlier types left empty but
/// never overwrite them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ResourceType {
    /// Nothing here.
    Empty,
    /// Raw ore.
    Ore,
    /// A harvestable tree.
    Tree,
    /// A water source.
    Water,
    /// An energy plant; yields extra energy when collected.
    Plant,
    /// Impassable terrain.
    Obstacle,
    /// A rare crystal that only appears through scattering or respawn.
    NewResource,
    /// A target beacon.
    Goal,
    /// The single charging station of the world.
    ChargingStation,
}

impl ResourceType {
    /// All variants in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Empty,
        Self::Ore,
        Self::Tree,
        Self::Water,
        Self::Plant,
        Self::Obstacle,
        Self::NewResource,
        Self::Goal,
        Self::ChargingStation,
    ];

    /// Whether an agent may enter a cell of this type.
    ///
    /// Only obstacles block movement.
    pub const fn is_passable(self) -> bool {
        !matches!(self, Self::Obstacle)
    }

    /// Whether an agent may collect this resource.
    pub const fn is_collectible(self) -> bool {
        !matches!(self, Self::Empty | Self::Obstacle | Self::ChargingStation)
    }

    /// Human-readable name shown to observers.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Ore => "Ore",
            Self::Tree => "Tree",
            Self::Water => "Water",
            Self::Plant => "Energy Plant",
            Self::Obstacle => "Obstacle",
            Self::NewResource => "Nova Crystal",
            Self::Goal => "Target Beacon",
            Self::ChargingStation => "Charging Station",
        }
    }
}

impl core::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// SQK effect kinds
// ---------------------------------------------------------------------------

/// The variant tag of an SQK effect, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EffectKind {
    /// Some resource cells yield bonus energy.
    ResourceBoost,
    /// One or all agents move faster.
    AgentSpeedBoost,
    /// Narrative-only event.
    GoalReveal,
}

impl EffectKind {
    /// All variants, in the order used for uniform selection.
    pub const ALL: [Self; 3] = [Self::ResourceBoost, Self::AgentSpeedBoost, Self::GoalReveal];

    /// Stable snake-case name, used in fallback narrative text and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResourceBoost => "resource_boost",
            Self::AgentSpeedBoost => "agent_speed_boost",
            Self::GoalReveal => "goal_reveal",
        }
    }
}

impl core::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Agent actions
// ---------------------------------------------------------------------------

/// A cardinal direction on the grid. North is towards row 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Direction {
    /// Towards row 0.
    North,
    /// Towards the last row.
    South,
    /// Towards column 0.
    West,
    /// Towards the last column.
    East,
}

impl Direction {
    /// All directions in the order valid moves are enumerated.
    pub const ALL: [Self; 4] = [Self::North, Self::South, Self::West, Self::East];

    /// Unit row/column delta of one step in this direction.
    pub const fn delta(self) -> (i64, i64) {
        match self {
            Self::North => (-1, 0),
            Self::South => (1, 0),
            Self::West => (0, -1),
            Self::East => (0, 1),
        }
    }
}

/// The action an agent chooses for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AgentAction {
    /// Move in a direction by the agent's effective speed.
    Move(Direction),
    /// Collect the resource on the current cell.
    Collect,
    /// Recharge at the charging station.
    Charge,
    /// Do nothing.
    Idle,
}

impl AgentAction {
    /// Whether this is a directional move.
    pub const fn is_move(self) -> bool {
        matches!(self, Self::Move(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_obstacles_block() {
        for resource in ResourceType::ALL {
            assert_eq!(resource.is_passable(), resource != ResourceType::Obstacle);
        }
    }

    #[test]
    fn collectibility() {
        let collectible: Vec<ResourceType> = ResourceType::ALL
            .into_iter()
            .filter(|r| r.is_collectible())
            .collect();
        assert_eq!(
            collectible,
            vec![
                ResourceType::Ore,
                ResourceType::Tree,
                ResourceType::Water,
                ResourceType::Plant,
                ResourceType::NewResource,
                ResourceType::Goal,
            ]
        );
    }

    #[test]
    fn effect_kind_names_are_snake_case() {
        assert_eq!(EffectKind::ResourceBoost.as_str(), "resource_boost");
        assert_eq!(EffectKind::AgentSpeedBoost.to_string(), "agent_speed_boost");
        let json = serde_json::to_string(&EffectKind::GoalReveal).unwrap_or_default();
        assert_eq!(json, "\"goal_reveal\"");
    }

    #[test]
    fn resource_order_matches_declaration() {
        let mut sorted = ResourceType::ALL;
        sorted.sort();
        assert_eq!(sorted, ResourceType::ALL);
    }

    #[test]
    fn direction_deltas() {
        assert_eq!(Direction::North.delta(), (-1, 0));
        assert_eq!(Direction::East.delta(), (0, 1));
        assert!(AgentAction::Move(Direction::West).is_move());
        assert!(!AgentAction::Charge.is_move());
    }
}
