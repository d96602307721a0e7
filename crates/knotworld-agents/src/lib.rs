//! Agent state, energy economy, and behavior for the Knotworld simulation.
//!
//! This crate is the logic layer for agents. It sits between
//! `knotworld-types` (the data structures) and `knotworld-core` (which
//! orchestrates ticks), and touches the grid only through
//! `knotworld-world`.
//!
//! # Modules
//!
//! - [`agent`] -- Spawning and effective speed under SQK effects
//! - [`config`] -- Agent parameters extracted from settings ([`AgentConfig`])
//! - [`energy`] -- Collect and charge gains, per-tick depletion
//! - [`error`] -- Error types for agent operations ([`AgentError`])
//! - [`inventory`] -- Per-type carry capacity
//! - [`policy`] -- Seeking-charge and foraging action selection
//! - [`resolve`] -- Applying chosen actions to agents and the grid

pub mod agent;
pub mod config;
pub mod energy;
pub mod error;
pub mod inventory;
pub mod policy;
pub mod resolve;

// Re-export primary types at crate root for convenience.
pub use agent::{effective_speed, spawn_agents};
pub use config::AgentConfig;
pub use error::AgentError;
pub use policy::{Mode, choose_action, mode_for};
pub use resolve::{ActionOutcome, resolve_action};
