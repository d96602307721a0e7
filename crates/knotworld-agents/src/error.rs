//! Error types for the knotworld-agents crate.
//!
//! Action resolution never fails; only spawning and the low-level
//! inventory helpers return [`AgentError`].

use knotworld_types::ResourceType;
use knotworld_world::WorldError;

/// Errors that can occur while creating agents or touching inventories.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The agent already holds as many of this resource as it may carry.
    #[error("inventory full: {resource} at capacity {capacity}")]
    InventoryFull {
        /// The resource being added.
        resource: ResourceType,
        /// The per-type carry capacity.
        capacity: u32,
    },

    /// The resource type can never be held.
    #[error("{0} cannot be collected")]
    NotCollectible(ResourceType),

    /// More agents were requested than ids can represent.
    #[error("agent count {0} does not fit the id space")]
    TooManyAgents(usize),

    /// Start placement on the grid failed.
    #[error("world error: {0}")]
    World(#[from] WorldError),
}
