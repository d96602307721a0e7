//! Shared type definitions for the Knotworld simulation.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace. Types flow downstream to `TypeScript` via `ts-rs` for
//! presentation clients.
//!
//! # Modules
//!
//! - [`ids`] -- Agent identifier newtype
//! - [`enums`] -- Cell contents, effect kinds, directions, and actions
//! - [`structs`] -- Grid cells, agents, knot events, and SQK effects
//! - [`settings`] -- The flat [`SimulationSettings`] record
//! - [`snapshot`] -- Read-only [`SimulationSnapshot`] for observers

pub mod enums;
pub mod ids;
pub mod settings;
pub mod snapshot;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AgentAction, Direction, EffectKind, ResourceType};
pub use ids::AgentId;
pub use settings::{SimulationSettings, default_resource_densities};
pub use snapshot::SimulationSnapshot;
pub use structs::{
    Agent, Coord, EffectDetails, GridCell, KnotEvent, SpeedTarget, SqkEffect, SubQuantumState,
};
