//! Engine binary for the Knotworld simulation.
//!
//! Wires the simulation, the narrative collaborator, the operator controls,
//! and the Observer API together, then runs the tick loop until a stop
//! condition is met.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `knotworld-config.yaml`
//! 3. Resolve settings (defaults, preset, overrides)
//! 4. Configure the narrator backend from the environment
//! 5. Build the simulation and the operator state
//! 6. Start the Observer API server
//! 7. Run the simulation loop and log the result

mod error;
mod observer_callback;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use knotworld_core::config::NarratorConfig;
use knotworld_core::runner::log_simulation_end;
use knotworld_core::{KnotworldConfig, OperatorState, Simulation, run_simulation};
use knotworld_narrator::{Narrator, NarratorSettings};
use knotworld_observer::{AppState, ServerConfig, spawn_observer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "knotworld-config.yaml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "KNOTWORLD_CONFIG";

/// Environment variable selecting the log format (`json` or anything else
/// for human-readable output).
const LOG_FORMAT_ENV: &str = "KNOTWORLD_LOG_FORMAT";

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    init_tracing();
    info!("knotworld-engine starting");

    let config = load_config()?;
    let settings = config.resolve_settings()?;
    info!(
        preset = config.preset.as_deref().unwrap_or("default"),
        rows = settings.grid_rows,
        cols = settings.grid_cols,
        agents = settings.num_agents,
        seed = ?settings.seed,
        tick_ms = settings.simulation_tick_ms,
        "Configuration loaded"
    );

    let narrator = build_narrator(&config.narrator)?;
    info!(enabled = narrator.is_enabled(), "Narrator ready");

    let narrative_timeout = config.run.narrative_timeout_ms.map(Duration::from_millis);
    let mut simulation = Simulation::new(settings)?.with_narrative_timeout(narrative_timeout);
    info!(
        agents = simulation.agents().len(),
        station = %simulation.world().charging_station(),
        "Simulation built"
    );

    let operator = Arc::new(OperatorState::new(
        simulation.settings().simulation_tick_ms,
        config.run.max_ticks,
    ));
    if config.run.start_paused {
        operator.pause();
        info!("Starting paused; resume or step through the operator API");
    }
    spawn_ctrl_c_handler(Arc::clone(&operator));

    let app_state = Arc::new(AppState::with_operator(
        simulation.snapshot(),
        Arc::clone(&operator),
    ));
    let observer = if config.observer.enabled {
        let server = ServerConfig::on_port(config.observer.port);
        Some(spawn_observer(&server, Arc::clone(&app_state)).await?)
    } else {
        info!("Observer API disabled");
        None
    };

    let mut callback = ObserverCallback::new(app_state);
    let result = run_simulation(&mut simulation, &narrator, &operator, &mut callback).await;
    log_simulation_end(&result, &simulation);

    if let Some(handle) = observer {
        handle.task.abort();
    }
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "knotworld-engine shutdown complete"
    );
    Ok(())
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`),
/// target names on, JSON lines when `KNOTWORLD_LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load `knotworld-config.yaml`, or the file named by `KNOTWORLD_CONFIG`.
///
/// A missing default file means built-in defaults; a missing explicitly
/// named file is an error.
fn load_config() -> Result<KnotworldConfig, EngineError> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    if explicit.is_none() && !path.exists() {
        info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(KnotworldConfig::default());
    }
    let config = KnotworldConfig::from_file(&path)?;
    info!(path = %path.display(), "Config file loaded");
    Ok(config)
}

/// Build the narrator. Disabled in config or without `NARRATOR_BACKEND`
/// every effect gets the fallback text.
fn build_narrator(config: &NarratorConfig) -> Result<Narrator, EngineError> {
    if !config.enabled {
        info!("Narrator disabled in config, using fallback narratives");
        return Ok(Narrator::Disabled);
    }
    let settings = NarratorSettings::from_env(
        Duration::from_millis(config.request_timeout_ms),
        config.max_tokens,
    )?;
    Ok(Narrator::from_settings(&settings)?)
}

/// Translate Ctrl-C into an operator stop so the run ends cleanly.
fn spawn_ctrl_c_handler(operator: Arc<OperatorState>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping after the current tick");
                operator.request_stop();
            }
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });
}
