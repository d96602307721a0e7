//! Operator control state for runtime simulation management.
//!
//! This module provides shared state used by the run loop and the
//! observer's operator endpoints. The operator can pause, resume,
//! single-step while paused, change tick speed, request a reset with new
//! settings, and trigger a clean stop without stopping the process.
//!
//! # Architecture
//!
//! Control flags are atomics wrapped in [`Arc`](std::sync::Arc) so the run
//! loop and the Axum handlers share them without locks on the hot path.
//! Every command that can release a paused loop also fires a [`Notify`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::{Preset, SettingsOverlay};

/// Smallest accepted tick interval.
pub const MIN_TICK_INTERVAL_MS: u64 = 10;

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// A request to rebuild the simulation from fresh settings.
///
/// Resolution follows the usual order: defaults, then `preset`, then
/// `settings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResetRequest {
    /// Preset to start from. `None` means plain defaults.
    #[serde(default)]
    pub preset: Option<Preset>,
    /// Field overrides applied on top of the preset.
    #[serde(default)]
    pub settings: Option<SettingsOverlay>,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    paused: AtomicBool,
    stop_requested: AtomicBool,
    pending_steps: AtomicU64,
    wake: Notify,
    tick_interval_ms: AtomicU64,
    started_at: DateTime<Utc>,
    max_ticks: Option<u64>,
    reset_request: Mutex<Option<ResetRequest>>,
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create a new operator state.
    pub fn new(tick_interval_ms: u64, max_ticks: Option<u64>) -> Self {
        Self {
            paused: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            pending_steps: AtomicU64::new(0),
            wake: Notify::new(),
            tick_interval_ms: AtomicU64::new(tick_interval_ms),
            started_at: Utc::now(),
            max_ticks,
            reset_request: Mutex::new(None),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume / Step
    // -----------------------------------------------------------------------

    /// Check whether the simulation is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the simulation. The run loop idles until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the simulation and wake the run loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.pending_steps.store(0, Ordering::Release);
        self.wake.notify_one();
    }

    /// Queue one tick to run while paused. Returns the number of queued
    /// steps, or `None` when the simulation is running.
    pub fn request_step(&self) -> Option<u64> {
        if !self.is_paused() {
            return None;
        }
        let queued = self.pending_steps.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        self.wake.notify_one();
        Some(queued)
    }

    /// Consume one queued step, if any.
    pub fn take_step(&self) -> bool {
        self.pending_steps
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Queued single steps.
    pub fn pending_steps(&self) -> u64 {
        self.pending_steps.load(Ordering::Acquire)
    }

    /// Wait for the next operator command while paused.
    ///
    /// Returns immediately if running, stopping, or holding a queued step.
    /// Callers re-check the state afterwards.
    pub async fn wait_for_command(&self) {
        if self.is_paused() && self.pending_steps() == 0 && !self.is_stop_requested() {
            self.wake.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop / Reset
    // -----------------------------------------------------------------------

    /// Request a clean simulation stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Ask the run loop to rebuild the simulation before its next tick.
    /// A newer request replaces an unapplied one.
    pub async fn request_reset(&self, request: ResetRequest) {
        *self.reset_request.lock().await = Some(request);
        self.wake.notify_one();
    }

    /// Take the pending reset request, if any.
    pub async fn take_reset(&self) -> Option<ResetRequest> {
        self.reset_request.lock().await.take()
    }

    /// Record the reason the simulation ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        *self.end_reason.lock().await = Some(reason);
    }

    /// Get the reason the simulation ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Get the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval in milliseconds.
    ///
    /// Returns the previous interval, or `None` if `ms` is below
    /// [`MIN_TICK_INTERVAL_MS`].
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        Some(self.tick_interval_ms.swap(ms, Ordering::AcqRel))
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `current_tick` has reached the configured limit.
    pub fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks.is_some_and(|max| current_tick >= max)
    }

    /// Get the configured max ticks.
    pub const fn max_ticks(&self) -> Option<u64> {
        self.max_ticks
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}

/// JSON-serializable run status for the operator API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStatus {
    /// Completed ticks of the current simulation.
    pub tick: u64,
    /// Whether the run loop is paused.
    pub paused: bool,
    /// Queued single steps.
    pub pending_steps: u64,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Configured tick limit.
    pub max_ticks: Option<u64>,
    /// Agents with energy left.
    pub active_agents: usize,
    /// Total agents.
    pub agents_total: usize,
    /// The reason the run ended, if it has.
    pub end_reason: Option<SimulationEndReason>,
    /// RFC 3339 timestamp of when the run started.
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_running() {
        let state = OperatorState::new(200, None);
        assert!(!state.is_paused());
        assert!(!state.is_stop_requested());
        assert_eq!(state.pending_steps(), 0);
    }

    #[test]
    fn pause_and_resume() {
        let state = OperatorState::new(200, None);
        state.pause();
        assert!(state.is_paused());
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn steps_only_queue_while_paused() {
        let state = OperatorState::new(200, None);
        assert_eq!(state.request_step(), None);
        state.pause();
        assert_eq!(state.request_step(), Some(1));
        assert_eq!(state.request_step(), Some(2));
        assert!(state.take_step());
        assert!(state.take_step());
        assert!(!state.take_step());
    }

    #[test]
    fn resume_discards_queued_steps() {
        let state = OperatorState::new(200, None);
        state.pause();
        let _ = state.request_step();
        state.resume();
        assert_eq!(state.pending_steps(), 0);
    }

    #[test]
    fn set_tick_interval() {
        let state = OperatorState::new(200, None);
        assert_eq!(state.set_tick_interval_ms(500), Some(200));
        assert_eq!(state.tick_interval_ms(), 500);
        assert_eq!(state.set_tick_interval_ms(MIN_TICK_INTERVAL_MS - 1), None);
        assert_eq!(state.tick_interval_ms(), 500);
    }

    #[test]
    fn tick_limit() {
        assert!(!OperatorState::new(0, None).tick_limit_reached(u64::MAX));
        let state = OperatorState::new(0, Some(100));
        assert!(!state.tick_limit_reached(99));
        assert!(state.tick_limit_reached(100));
    }

    #[tokio::test]
    async fn reset_request_is_taken_once() {
        let state = OperatorState::new(0, None);
        state
            .request_reset(ResetRequest {
                preset: Some(Preset::Chaotic),
                settings: None,
            })
            .await;
        let taken = state.take_reset().await;
        assert_eq!(taken.and_then(|r| r.preset), Some(Preset::Chaotic));
        assert!(state.take_reset().await.is_none());
    }

    #[tokio::test]
    async fn stop_wakes_a_paused_waiter() {
        let state = std::sync::Arc::new(OperatorState::new(0, None));
        state.pause();
        let waiter = {
            let state = std::sync::Arc::clone(&state);
            tokio::spawn(async move { state.wait_for_command().await })
        };
        state.request_stop();
        let joined = tokio::time::timeout(std::time::Duration::from_secs(5), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[test]
    fn reset_request_parses_from_json() {
        let parsed: ResetRequest =
            serde_json::from_str(r#"{"preset":"resonance_prone","settings":{"num_agents":4}}"#)
                .unwrap_or_default();
        assert_eq!(parsed.preset, Some(Preset::ResonanceProne));
        assert_eq!(parsed.settings.and_then(|s| s.num_agents), Some(4));
    }
}
