//! Type-safe identifier wrappers.
//!
//! Agents are numbered densely from zero in spawn order. The newtype keeps
//! agent ids from being mixed up with grid coordinates or counters at
//! compile time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Stable identifier of an agent within one simulation instance.
///
/// Ids are assigned `0..num_agents` at construction and never reused.
/// Ordering follows the numeric value, which is also the order in which
/// the orchestrator resolves agent actions each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct AgentId(pub u32);

impl AgentId {
    /// Wrap a raw numeric id.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Return the raw numeric id.
    pub const fn into_inner(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AgentId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<AgentId> for u32 {
    fn from(id: AgentId) -> Self {
        id.0
    }
}
