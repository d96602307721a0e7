//! The SubQuantum System: two noisy oscillators and their coupling
//! detectors.
//!
//! Each tick both channels are sampled at the absolute simulation time.
//! A **knot** fires when both exceed `threshold_s` and match after rounding
//! to `decimal_precision` digits. Independently, the channels are
//! **communication conducive** when both exceed
//! `threshold_s * comm_threshold_factor` and match after rounding to
//! `comm_decimal_precision` digits. The second predicate has no memory.
//!
//! The arithmetic lives in free functions so it can be tested with fixed
//! wave values; [`SubQuantumSystem`] only adds noise draws and history.

use core::f64::consts::PI;

use knotworld_types::{KnotEvent, SimulationSettings, SubQuantumState};
use rand::Rng;
use tracing::debug;

use crate::knot_history::KnotHistory;

/// Upper clamp of a wave value.
pub const WAVE_CEILING: f64 = 1.5;

/// Baseline of the `Re(s)` projection.
const RES_BASE: f64 = 0.45;

/// Bounds of the `Re(s)` projection.
const RES_MIN: f64 = 0.01;
const RES_MAX: f64 = 0.99;

/// The nine oscillator tuning constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SqsParams {
    /// Energy channel frequency.
    pub f_energy: f64,
    /// Phase channel frequency.
    pub f_phase: f64,
    /// Half-width of the uniform noise.
    pub noise_factor: f64,
    /// Knot threshold.
    pub threshold_s: f64,
    /// Knot rounding digits.
    pub decimal_precision: u32,
    /// Normalization period in ticks.
    pub max_sim_time_period: u64,
    /// `Re(s)` projection constant.
    pub res_projection_c: f64,
    /// Communication threshold as a fraction of `threshold_s`.
    pub comm_threshold_factor: f64,
    /// Communication rounding digits.
    pub comm_decimal_precision: u32,
}

impl SqsParams {
    /// Extract the oscillator constants from a settings record.
    pub const fn from_settings(settings: &SimulationSettings) -> Self {
        Self {
            f_energy: settings.sqs_f_energy,
            f_phase: settings.sqs_f_phase,
            noise_factor: settings.sqs_noise_factor,
            threshold_s: settings.sqs_threshold_s,
            decimal_precision: settings.sqs_decimal_precision,
            max_sim_time_period: settings.sqs_max_sim_time_period,
            res_projection_c: settings.sqs_res_projection_c,
            comm_threshold_factor: settings.sqs_comm_threshold_factor,
            comm_decimal_precision: settings.sqs_comm_decimal_precision,
        }
    }
}

// ---------------------------------------------------------------------------
// Pure arithmetic
// ---------------------------------------------------------------------------

fn pow10(digits: u32) -> f64 {
    10f64.powi(i32::try_from(digits).unwrap_or(i32::MAX))
}

/// Round `value` to `digits` decimal places, halves away from zero.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let scale = pow10(digits);
    (value * scale).round() / scale
}

/// Noise-free wave shape in `[0, 1]` for a channel at time `t`.
#[allow(clippy::cast_precision_loss)]
pub fn base_wave(frequency: f64, period: u64, t: u64) -> f64 {
    let period = period.max(1);
    let normalized = (t % period) as f64 / period as f64;
    (2.0 * PI * frequency * period as f64 * normalized).sin().mul_add(0.5, 0.5)
}

/// Wave value with `noise` added, clamped to `[0, WAVE_CEILING]`.
pub fn wave_value(frequency: f64, period: u64, t: u64, noise: f64) -> f64 {
    (base_wave(frequency, period, t) + noise).clamp(0.0, WAVE_CEILING)
}

/// Whether two values match after rounding to `digits` places, within
/// `10^-(digits+1)`.
pub fn rounded_match(a: f64, b: f64, digits: u32) -> bool {
    let tolerance = 1.0 / pow10(digits.saturating_add(1));
    (round_to(a, digits) - round_to(b, digits)).abs() < tolerance
}

/// The knot predicate.
pub fn detect_knot(energy: f64, phase: f64, threshold_s: f64, digits: u32) -> bool {
    energy > threshold_s && phase > threshold_s && rounded_match(energy, phase, digits)
}

/// The communication-conducive predicate.
pub fn is_communication_conducive(energy: f64, phase: f64, params: &SqsParams) -> bool {
    let threshold = params.threshold_s * params.comm_threshold_factor;
    energy > threshold && phase > threshold && rounded_match(energy, phase, params.comm_decimal_precision)
}

/// Project a knot's mean wave value onto the `Re(s)` scalar.
pub fn project_res(mean: f64, params: &SqsParams) -> f64 {
    let value = (mean - params.threshold_s).mul_add(params.res_projection_c * 5.0, RES_BASE);
    value.clamp(RES_MIN, RES_MAX)
}

// ---------------------------------------------------------------------------
// Stateful detector
// ---------------------------------------------------------------------------

/// The oscillator pair plus the bounded knot history.
#[derive(Debug, Clone)]
pub struct SubQuantumSystem {
    params: SqsParams,
    energy_wave: f64,
    phase_wave: f64,
    communication_conducive: bool,
    history: KnotHistory,
}

impl SubQuantumSystem {
    /// A detector with zeroed waves and empty history. Call
    /// [`update`](Self::update) to take the first sample.
    pub fn new(params: SqsParams) -> Self {
        Self {
            params,
            energy_wave: 0.0,
            phase_wave: 0.0,
            communication_conducive: false,
            history: KnotHistory::new(),
        }
    }

    fn noise(&self, rng: &mut impl Rng) -> f64 {
        let width = self.params.noise_factor;
        if width > 0.0 {
            (rng.random::<f64>() - 0.5) * 2.0 * width
        } else {
            0.0
        }
    }

    /// Sample both channels at absolute time `t` and run both detectors.
    ///
    /// Returns the knot recorded this tick, if one fired.
    pub fn update(&mut self, t: u64, rng: &mut impl Rng) -> Option<KnotEvent> {
        let period = self.params.max_sim_time_period;
        let energy_noise = self.noise(rng);
        let phase_noise = self.noise(rng);
        let energy = wave_value(self.params.f_energy, period, t, energy_noise);
        let phase = wave_value(self.params.f_phase, period, t, phase_noise);
        self.observe(t, energy, phase)
    }

    /// Run both detectors on given wave values at time `t`.
    pub fn observe(&mut self, t: u64, energy: f64, phase: f64) -> Option<KnotEvent> {
        self.energy_wave = energy;
        self.phase_wave = phase;
        self.communication_conducive = is_communication_conducive(energy, phase, &self.params);

        if !detect_knot(energy, phase, self.params.threshold_s, self.params.decimal_precision) {
            return None;
        }
        let event = KnotEvent {
            tick: t,
            energy_value: energy,
            phase_value: phase,
            projected_res: project_res((energy + phase) / 2.0, &self.params),
        };
        debug!(
            tick = t,
            energy,
            phase,
            projected_res = event.projected_res,
            "knot detected"
        );
        self.history.push(event);
        Some(event)
    }

    /// Current energy channel value.
    pub const fn energy_wave(&self) -> f64 {
        self.energy_wave
    }

    /// Current phase channel value.
    pub const fn phase_wave(&self) -> f64 {
        self.phase_wave
    }

    /// Whether the latest sample was communication conducive.
    pub const fn communication_conducive(&self) -> bool {
        self.communication_conducive
    }

    /// Recent knots.
    pub const fn history(&self) -> &KnotHistory {
        &self.history
    }

    /// The tuning constants in force.
    pub const fn params(&self) -> &SqsParams {
        &self.params
    }

    /// Observable state for snapshots.
    pub fn state(&self) -> SubQuantumState {
        SubQuantumState {
            energy_wave: self.energy_wave,
            phase_wave: self.phase_wave,
            communication_conducive: self.communication_conducive,
            knot_history: self.history.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn params() -> SqsParams {
        SqsParams::from_settings(&SimulationSettings::default())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn knot_fires_at_coarse_precision_only() {
        assert!(detect_knot(0.970, 0.971, 0.96, 2));
        assert!(!detect_knot(0.970, 0.971, 0.96, 3));
    }

    #[test]
    fn knot_requires_both_above_threshold() {
        assert!(!detect_knot(0.955, 0.955, 0.96, 3));
        assert!(!detect_knot(0.99, 0.95, 0.96, 1));
    }

    #[test]
    fn communication_is_independent_of_knots() {
        let mut sqs = SubQuantumSystem::new(params());
        // Above 0.96 * 0.9 = 0.864 and equal at 2 digits, but below the
        // knot threshold.
        let fired = sqs.observe(10, 0.901, 0.898);
        assert!(fired.is_none());
        assert!(sqs.communication_conducive());
        assert!(sqs.history().is_empty());

        // Next sample drops out of range: no hysteresis.
        sqs.observe(11, 0.5, 0.5);
        assert!(!sqs.communication_conducive());
    }

    #[test]
    fn knot_records_projection_and_history() {
        let p = SqsParams {
            decimal_precision: 2,
            ..params()
        };
        let mut sqs = SubQuantumSystem::new(p);
        let knot = sqs.observe(42, 0.970, 0.971);
        let knot = knot.unwrap_or_else(|| panic!("expected a knot"));
        assert_eq!(knot.tick, 42);
        // 0.45 + (0.9705 - 0.96) * 0.5
        assert!(approx(knot.projected_res, 0.455_25));
        assert_eq!(sqs.history().len(), 1);
        assert_eq!(sqs.state().knot_history.len(), 1);
    }

    #[test]
    fn projection_is_clamped() {
        let p = SqsParams {
            res_projection_c: 100.0,
            ..params()
        };
        assert!(approx(project_res(1.5, &p), 0.99));
        assert!(approx(project_res(0.0, &p), 0.01));
    }

    #[test]
    fn waves_stay_in_range() {
        let p = SqsParams {
            noise_factor: 2.0,
            ..params()
        };
        let mut rng = SmallRng::seed_from_u64(17);
        let mut sqs = SubQuantumSystem::new(p);
        for t in 0..2_000 {
            sqs.update(t, &mut rng);
            assert!((0.0..=WAVE_CEILING).contains(&sqs.energy_wave()));
            assert!((0.0..=WAVE_CEILING).contains(&sqs.phase_wave()));
            assert!(sqs.history().len() <= crate::knot_history::KNOT_HISTORY_CAPACITY);
        }
    }

    #[test]
    fn wave_shape_without_noise() {
        // sin(0) -> 0.5; a quarter of the way through one full cycle -> 1.0.
        assert!(approx(base_wave(0.002, 500, 0), 0.5));
        assert!(approx(base_wave(0.002, 500, 125), 1.0));
        assert!(approx(base_wave(0.002, 500, 500), 0.5));
    }

    #[test]
    fn unreachable_threshold_never_fires() {
        let p = SqsParams {
            threshold_s: 2.0,
            ..params()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let mut sqs = SubQuantumSystem::new(p);
        for t in 0..1_000 {
            assert!(sqs.update(t, &mut rng).is_none());
        }
    }

    #[test]
    fn rounding_matches_fixed_decimal_display() {
        assert!(approx(round_to(0.971, 2), 0.97));
        assert!(approx(round_to(0.9749, 3), 0.975));
        assert!(rounded_match(0.9701, 0.9704, 3));
        assert!(!rounded_match(0.9701, 0.9706, 3));
    }
}
