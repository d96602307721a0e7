//! Inventory operations for agents.
//!
//! Capacity is per resource type: an agent with carry capacity 2 may hold
//! two ore and two water at the same time. All arithmetic is checked.

use knotworld_types::{Agent, ResourceType};

use crate::error::AgentError;

/// Whether the agent can take one more unit of `resource`.
pub fn has_capacity(agent: &Agent, resource: ResourceType) -> bool {
    resource.is_collectible() && agent.held(resource) < agent.carry_capacity
}

/// Add one unit of `resource`, returning the new count.
///
/// # Errors
///
/// Returns [`AgentError::NotCollectible`] for terrain types and
/// [`AgentError::InventoryFull`] when the per-type capacity is reached.
pub fn add_one(agent: &mut Agent, resource: ResourceType) -> Result<u32, AgentError> {
    if !resource.is_collectible() {
        return Err(AgentError::NotCollectible(resource));
    }
    let capacity = agent.carry_capacity;
    let held = agent.held(resource);
    if held >= capacity {
        return Err(AgentError::InventoryFull { resource, capacity });
    }
    let next = held
        .checked_add(1)
        .ok_or(AgentError::InventoryFull { resource, capacity })?;
    agent.inventory.insert(resource, next);
    Ok(next)
}
