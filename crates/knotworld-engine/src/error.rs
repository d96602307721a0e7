//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a subsystem error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: knotworld_core::ConfigError,
    },

    /// The simulation could not be built.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: knotworld_core::SimulationError,
    },

    /// The narrator backend could not be configured.
    #[error("narrator error: {source}")]
    Narrator {
        /// The underlying narrator error.
        #[from]
        source: knotworld_narrator::NarratorError,
    },

    /// The observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: knotworld_observer::ServerError,
    },
}
