//! Grid terrain for the Knotworld simulation.
//!
//! This crate owns the physical world: a rectangular grid of cells holding
//! resources or obstacles, with exactly one charging station at a fixed
//! coordinate.
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid construction and placement.
//! - [`grid`] -- [`GridWorld`]: bounds-checked cell access, movement
//!   targets, and boost flags.
//! - [`generation`] -- Random obstacle and resource scattering, and agent
//!   start placement with bounded retries.
//! - [`respawn`] -- Per-tick chance of a resource reappearing on an empty
//!   cell.

pub mod error;
pub mod generation;
pub mod grid;
pub mod respawn;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use generation::{GenerationParams, generate_world, pick_agent_starts, scaled_count};
pub use grid::GridWorld;
pub use respawn::{maybe_respawn, respawn_probability};
