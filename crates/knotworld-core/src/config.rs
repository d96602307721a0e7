//! Configuration loading, presets, and validation.
//!
//! The canonical configuration lives in `knotworld-config.yaml` at the
//! project root. Settings are resolved in a fixed order:
//!
//! 1. Full defaults ([`SimulationSettings::default`]).
//! 2. The named [`Preset`], if any, as a shallow overlay.
//! 3. The `settings:` block of the YAML file, as a second overlay.
//! 4. [`sanitize`]: non-finite numbers fall back to the default value.
//! 5. [`validate`]: out-of-range values are rejected.
//!
//! Overlays carry only the fields they name, so no step can leave a field
//! undefined.

use std::collections::BTreeMap;
use std::path::Path;

use knotworld_types::{Coord, ResourceType, SimulationSettings};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The preset name is not one of the known presets.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    /// A setting is outside its allowed range.
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

// ---------------------------------------------------------------------------
// Overlays and presets
// ---------------------------------------------------------------------------

/// A partial settings record. Every `Some` field replaces the
/// corresponding field of the base it is applied to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(missing_docs)]
pub struct SettingsOverlay {
    pub grid_rows: Option<usize>,
    pub grid_cols: Option<usize>,
    pub num_agents: Option<u32>,
    pub initial_energy: Option<f64>,
    pub energy_depletion_rate: Option<f64>,
    pub resource_recharge_amount: Option<f64>,
    pub plant_recharge_multiplier: Option<f64>,
    pub agent_base_speed: Option<u32>,
    pub agent_base_carry_capacity: Option<u32>,
    pub low_energy_threshold: Option<f64>,
    pub charging_station_recharge_per_step: Option<f64>,
    pub charging_station: Option<Coord>,
    pub obstacle_density: Option<f64>,
    pub resource_densities: Option<BTreeMap<ResourceType, f64>>,
    pub resource_respawn_rate: Option<f64>,
    pub sqs_f_energy: Option<f64>,
    pub sqs_f_phase: Option<f64>,
    pub sqs_noise_factor: Option<f64>,
    pub sqs_threshold_s: Option<f64>,
    pub sqs_decimal_precision: Option<u32>,
    pub sqs_max_sim_time_period: Option<u64>,
    pub sqs_res_projection_c: Option<f64>,
    pub sqs_comm_threshold_factor: Option<f64>,
    pub sqs_comm_decimal_precision: Option<u32>,
    pub sqk_effect_duration_min: Option<u32>,
    pub sqk_effect_duration_max: Option<u32>,
    pub sqk_speed_boost_multiplier_min: Option<f64>,
    pub sqk_speed_boost_multiplier_max: Option<f64>,
    pub simulation_tick_ms: Option<u64>,
    pub show_internal_wave_values: Option<bool>,
    pub seed: Option<u64>,
}

macro_rules! overlay_fields {
    ($overlay:expr, $target:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $overlay.$field.clone() {
                $target.$field = value;
            }
        )+
    };
}

impl SettingsOverlay {
    /// Apply this overlay on top of `base`.
    pub fn apply_to(&self, base: &mut SimulationSettings) {
        overlay_fields!(
            self,
            base,
            grid_rows,
            grid_cols,
            num_agents,
            initial_energy,
            energy_depletion_rate,
            resource_recharge_amount,
            plant_recharge_multiplier,
            agent_base_speed,
            agent_base_carry_capacity,
            low_energy_threshold,
            charging_station_recharge_per_step,
            charging_station,
            obstacle_density,
            resource_densities,
            resource_respawn_rate,
            sqs_f_energy,
            sqs_f_phase,
            sqs_noise_factor,
            sqs_threshold_s,
            sqs_decimal_precision,
            sqs_max_sim_time_period,
            sqs_res_projection_c,
            sqs_comm_threshold_factor,
            sqs_comm_decimal_precision,
            sqk_effect_duration_min,
            sqk_effect_duration_max,
            sqk_speed_boost_multiplier_min,
            sqk_speed_boost_multiplier_max,
            simulation_tick_ms,
            show_internal_wave_values,
        );
        if self.seed.is_some() {
            base.seed = self.seed;
        }
    }
}

/// Named parameter sets tuned for different oscillator behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Plain defaults.
    Default,
    /// Noisy, fast oscillators with a low threshold: frequent short effects.
    Chaotic,
    /// Quiet, slow, same-frequency oscillators: rare long effects.
    Harmonic,
    /// Lower threshold and coarser rounding: knots fire easily.
    ResonanceProne,
    /// Threshold above the wave ceiling and finer rounding.
    ResonanceResistant,
}

impl Preset {
    /// All presets in display order.
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::Chaotic,
        Self::Harmonic,
        Self::ResonanceProne,
        Self::ResonanceResistant,
    ];

    /// Stable snake-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Chaotic => "chaotic",
            Self::Harmonic => "harmonic",
            Self::ResonanceProne => "resonance_prone",
            Self::ResonanceResistant => "resonance_resistant",
        }
    }

    /// Look a preset up by its snake-case name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPreset`] for unknown names.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_owned()))
    }

    /// The fields this preset overrides.
    pub fn overlay(self) -> SettingsOverlay {
        match self {
            Self::Default => SettingsOverlay::default(),
            Self::Chaotic => SettingsOverlay {
                sqs_noise_factor: Some(0.25),
                sqs_threshold_s: Some(0.85),
                sqs_f_energy: Some(0.02),
                sqs_f_phase: Some(0.025),
                sqk_effect_duration_min: Some(10),
                sqk_effect_duration_max: Some(25),
                resource_respawn_rate: Some(0.05),
                energy_depletion_rate: Some(0.7),
                ..SettingsOverlay::default()
            },
            Self::Harmonic => SettingsOverlay {
                sqs_noise_factor: Some(0.01),
                sqs_threshold_s: Some(0.98),
                sqs_f_energy: Some(0.005),
                sqs_f_phase: Some(0.005),
                sqk_effect_duration_min: Some(30),
                sqk_effect_duration_max: Some(60),
                sqs_comm_threshold_factor: Some(0.95),
                energy_depletion_rate: Some(0.3),
                ..SettingsOverlay::default()
            },
            Self::ResonanceProne => SettingsOverlay {
                sqs_threshold_s: Some(0.90),
                sqs_decimal_precision: Some(2),
                sqs_comm_decimal_precision: Some(1),
                sqs_comm_threshold_factor: Some(0.85),
                ..SettingsOverlay::default()
            },
            Self::ResonanceResistant => SettingsOverlay {
                sqs_threshold_s: Some(1.1),
                sqs_decimal_precision: Some(4),
                sqs_noise_factor: Some(0.05),
                ..SettingsOverlay::default()
            },
        }
    }

    /// Full settings for this preset: defaults with the overlay applied.
    pub fn settings(self) -> SimulationSettings {
        let mut settings = SimulationSettings::default();
        self.overlay().apply_to(&mut settings);
        settings
    }
}

impl core::fmt::Display for Preset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Sanitize and validate
// ---------------------------------------------------------------------------

/// Replace every non-finite float with its default value, logging each
/// replacement. Returns the names of the fields that were coerced.
pub fn sanitize(settings: &mut SimulationSettings) -> Vec<&'static str> {
    let defaults = SimulationSettings::default();
    let mut coerced = Vec::new();

    macro_rules! finite_or_default {
        ($($field:ident),+ $(,)?) => {
            $(
                if !settings.$field.is_finite() {
                    warn!(
                        field = stringify!($field),
                        default = defaults.$field,
                        "non-finite setting replaced with default"
                    );
                    settings.$field = defaults.$field;
                    coerced.push(stringify!($field));
                }
            )+
        };
    }

    finite_or_default!(
        initial_energy,
        energy_depletion_rate,
        resource_recharge_amount,
        plant_recharge_multiplier,
        low_energy_threshold,
        charging_station_recharge_per_step,
        obstacle_density,
        resource_respawn_rate,
        sqs_f_energy,
        sqs_f_phase,
        sqs_noise_factor,
        sqs_threshold_s,
        sqs_res_projection_c,
        sqs_comm_threshold_factor,
        sqk_speed_boost_multiplier_min,
        sqk_speed_boost_multiplier_max,
    );

    let before = settings.resource_densities.len();
    settings
        .resource_densities
        .retain(|resource, density| density.is_finite() && resource.is_collectible());
    if settings.resource_densities.len() != before {
        warn!(
            dropped = before.saturating_sub(settings.resource_densities.len()),
            "invalid resource density entries dropped"
        );
        coerced.push("resource_densities");
    }
    coerced
}

/// Largest supported grid side.
pub const MAX_GRID_SIDE: usize = 500;

/// Largest supported rounding precision for the oscillator readouts.
pub const MAX_DECIMAL_PRECISION: u32 = 10;

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} is outside [0, 1]")))
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} must be a finite non-negative number")))
    }
}

/// Every float setting must be finite, NaN included.
fn require_finite(settings: &SimulationSettings) -> Result<(), ConfigError> {
    macro_rules! finite {
        ($($field:ident),+ $(,)?) => {
            $(
                if !settings.$field.is_finite() {
                    return Err(invalid(
                        stringify!($field),
                        format!("{} is not a finite number", settings.$field),
                    ));
                }
            )+
        };
    }

    finite!(
        initial_energy,
        energy_depletion_rate,
        resource_recharge_amount,
        plant_recharge_multiplier,
        low_energy_threshold,
        charging_station_recharge_per_step,
        obstacle_density,
        resource_respawn_rate,
        sqs_f_energy,
        sqs_f_phase,
        sqs_noise_factor,
        sqs_threshold_s,
        sqs_res_projection_c,
        sqs_comm_threshold_factor,
        sqk_speed_boost_multiplier_min,
        sqk_speed_boost_multiplier_max,
    );
    Ok(())
}

/// Reject settings a simulation cannot run with.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming the first offending field.
pub fn validate(settings: &SimulationSettings) -> Result<(), ConfigError> {
    require_finite(settings)?;
    for (field, side) in [("grid_rows", settings.grid_rows), ("grid_cols", settings.grid_cols)] {
        if side == 0 || side > MAX_GRID_SIDE {
            return Err(invalid(field, format!("{side} is outside [1, {MAX_GRID_SIDE}]")));
        }
    }
    let station = settings.charging_station;
    if station.row >= settings.grid_rows || station.col >= settings.grid_cols {
        return Err(invalid("charging_station", format!("{station} is outside the grid")));
    }
    let capacity = settings.area().saturating_sub(1);
    let agents = usize::try_from(settings.num_agents).unwrap_or(usize::MAX);
    if agents > capacity {
        return Err(invalid(
            "num_agents",
            format!("{agents} agents do not fit on {capacity} free cells"),
        ));
    }

    if settings.initial_energy <= 0.0 {
        return Err(invalid("initial_energy", "must be positive"));
    }
    check_non_negative("energy_depletion_rate", settings.energy_depletion_rate)?;
    check_non_negative("resource_recharge_amount", settings.resource_recharge_amount)?;
    check_non_negative("plant_recharge_multiplier", settings.plant_recharge_multiplier)?;
    check_non_negative("low_energy_threshold", settings.low_energy_threshold)?;
    check_non_negative(
        "charging_station_recharge_per_step",
        settings.charging_station_recharge_per_step,
    )?;
    if settings.agent_base_speed == 0 {
        return Err(invalid("agent_base_speed", "must be at least 1"));
    }
    if settings.agent_base_carry_capacity == 0 {
        return Err(invalid("agent_base_carry_capacity", "must be at least 1"));
    }

    check_unit("obstacle_density", settings.obstacle_density)?;
    for density in settings.resource_densities.values() {
        check_unit("resource_densities", *density)?;
    }
    check_non_negative("resource_respawn_rate", settings.resource_respawn_rate)?;

    check_non_negative("sqs_f_energy", settings.sqs_f_energy)?;
    check_non_negative("sqs_f_phase", settings.sqs_f_phase)?;
    check_non_negative("sqs_noise_factor", settings.sqs_noise_factor)?;
    check_non_negative("sqs_threshold_s", settings.sqs_threshold_s)?;
    check_non_negative("sqs_res_projection_c", settings.sqs_res_projection_c)?;
    check_non_negative("sqs_comm_threshold_factor", settings.sqs_comm_threshold_factor)?;
    if settings.sqs_max_sim_time_period == 0 {
        return Err(invalid("sqs_max_sim_time_period", "must be at least 1"));
    }
    for (field, digits) in [
        ("sqs_decimal_precision", settings.sqs_decimal_precision),
        ("sqs_comm_decimal_precision", settings.sqs_comm_decimal_precision),
    ] {
        if digits > MAX_DECIMAL_PRECISION {
            return Err(invalid(field, format!("{digits} exceeds {MAX_DECIMAL_PRECISION}")));
        }
    }

    if settings.sqk_effect_duration_min == 0 {
        return Err(invalid("sqk_effect_duration_min", "must be at least 1"));
    }
    if settings.sqk_effect_duration_min > settings.sqk_effect_duration_max {
        return Err(invalid("sqk_effect_duration_max", "must not be below the minimum"));
    }
    check_non_negative(
        "sqk_speed_boost_multiplier_min",
        settings.sqk_speed_boost_multiplier_min,
    )?;
    check_non_negative(
        "sqk_speed_boost_multiplier_max",
        settings.sqk_speed_boost_multiplier_max,
    )?;
    if settings.sqk_speed_boost_multiplier_min > settings.sqk_speed_boost_multiplier_max {
        return Err(invalid(
            "sqk_speed_boost_multiplier_max",
            "must not be below the minimum",
        ));
    }
    Ok(())
}

/// Build settings from an optional preset and an optional overlay, then
/// sanitize and validate them.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the result fails validation.
pub fn resolve_settings(
    preset: Option<Preset>,
    overrides: Option<&SettingsOverlay>,
) -> Result<SimulationSettings, ConfigError> {
    let mut settings = preset.unwrap_or(Preset::Default).settings();
    if let Some(overlay) = overrides {
        overlay.apply_to(&mut settings);
    }
    sanitize(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

// ---------------------------------------------------------------------------
// File configuration
// ---------------------------------------------------------------------------

/// Top-level configuration, mirroring `knotworld-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KnotworldConfig {
    /// Preset applied before the `settings` overrides.
    #[serde(default)]
    pub preset: Option<String>,

    /// Simulation setting overrides.
    #[serde(default)]
    pub settings: SettingsOverlay,

    /// Narrative collaborator settings.
    #[serde(default)]
    pub narrator: NarratorConfig,

    /// Observer API settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Run loop bounds.
    #[serde(default)]
    pub run: RunConfig,
}

impl KnotworldConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// The named preset, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPreset`] for unknown names.
    pub fn preset(&self) -> Result<Option<Preset>, ConfigError> {
        self.preset.as_deref().map(Preset::from_name).transpose()
    }

    /// Resolve the final simulation settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPreset`] or [`ConfigError::Invalid`].
    pub fn resolve_settings(&self) -> Result<SimulationSettings, ConfigError> {
        resolve_settings(self.preset()?, Some(&self.settings))
    }
}

/// Narrative collaborator configuration. Backend credentials come from the
/// environment (see `knotworld-narrator`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NarratorConfig {
    /// Whether to call the LLM backend at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HTTP timeout for one narrative request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Token budget for one narrative.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            request_timeout_ms: default_request_timeout_ms(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Observer API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Whether to serve the observer API.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// TCP port to listen on.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            port: default_observer_port(),
        }
    }
}

/// Run loop configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Stop after this many ticks. `None` runs until stopped.
    #[serde(default)]
    pub max_ticks: Option<u64>,

    /// Upper bound on the wait for a narrative before the fallback text is
    /// used. `None` waits for the collaborator however long it takes.
    #[serde(default)]
    pub narrative_timeout_ms: Option<u64>,

    /// Start paused and wait for an operator resume or step.
    #[serde(default)]
    pub start_paused: bool,
}

const fn default_true() -> bool {
    true
}

const fn default_request_timeout_ms() -> u64 {
    7000
}

const fn default_max_tokens() -> u32 {
    120
}

const fn default_observer_port() -> u16 {
    8080
}
