//! Configuration, SubQuantum System, SQK effects, and the tick
//! orchestrator for the Knotworld simulation.
//!
//! # Modules
//!
//! - [`config`] -- Settings presets, overlays, sanitizing and validation,
//!   plus loading `knotworld-config.yaml`.
//! - [`subquantum`] -- The two-oscillator SubQuantum System with knot and
//!   communication detection.
//! - [`knot_history`] -- Bounded ring buffer of recent knots.
//! - [`effect`] -- SQK effect planning, commit, decay, and boost cleanup.
//! - [`narrative`] -- [`NarrativeSource`] trait and [`StubNarrativeSource`].
//! - [`simulation`] -- The [`Simulation`] orchestrator and per-tick
//!   [`TickSummary`].
//! - [`operator`] -- Shared pause/step/speed/reset/stop control state.
//! - [`runner`] -- The run loop driving a simulation under operator
//!   control.
//!
//! [`NarrativeSource`]: narrative::NarrativeSource
//! [`StubNarrativeSource`]: narrative::StubNarrativeSource
//! [`Simulation`]: simulation::Simulation
//! [`TickSummary`]: simulation::TickSummary

pub mod config;
pub mod effect;
pub mod knot_history;
pub mod narrative;
pub mod operator;
pub mod runner;
pub mod simulation;
pub mod subquantum;

// Re-export primary types at crate root.
pub use config::{ConfigError, KnotworldConfig, Preset, SettingsOverlay};
pub use narrative::{NarrativeError, NarrativeRequest, NarrativeSource, StubNarrativeSource};
pub use operator::{OperatorState, ResetRequest, SimulationEndReason, SimulationStatus};
pub use runner::{NoOpCallback, SimulationResult, TickCallback, run_simulation};
pub use simulation::{AgentTick, Respawn, Simulation, SimulationError, TickSummary};
