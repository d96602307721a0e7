//! Observer API server for the Knotworld simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/ticks`) streaming one [`TickBroadcast`]
//!   per tick via [`tokio::sync::broadcast`]
//! - **REST endpoints** for the current snapshot, settings, presets,
//!   agents, and knot history
//! - **Operator REST endpoints** for runtime control (pause, resume,
//!   step, speed, reset, stop, status)
//! - **Minimal HTML page** (`GET /`) with the grid and the rounded wave
//!   readout
//!
//! # Architecture
//!
//! The observer reads from an in-memory [`SimulationSnapshot`] that the
//! engine replaces after every tick. REST handlers only ever take a read
//! lock on that copy, so the observer never blocks the tick loop.
//!
//! [`SimulationSnapshot`]: knotworld_types::SimulationSnapshot

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{ObserverHandle, spawn_observer};
pub use state::{AppState, TickBroadcast};
