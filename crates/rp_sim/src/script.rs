//! Read-only entity views for the scripting bridge.
//!
//! Scripts refer to entities by id and pull small snapshots of state
//! (kind, owning player, movement state) as plain values. No scripting
//! runtime lives in the core; the bridge layers on top of these queries.

use crate::components::PathingComponent;
use crate::entity::EntityId;
use crate::manager::EntityManager;

/// Snapshot of the script-visible state of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntity {
    /// Entity id, the handle scripts hold.
    pub id: EntityId,
    /// Template name the entity was created from.
    pub kind: String,
    /// Owning player number, from the `player` attribute.
    pub player: Option<i64>,
    /// Movement state name: `idle`, `requested`, `following`, `arrived`.
    pub state: String,
}

/// Build the script view of an entity, or `None` if the id is dead.
#[must_use]
pub fn script_view(manager: &EntityManager, id: EntityId) -> Option<ScriptEntity> {
    let entity = manager.entity(id)?;
    let state = entity
        .component::<PathingComponent>()
        .map_or("idle", |pathing| pathing.state().as_str());
    Some(ScriptEntity {
        id,
        kind: entity.kind().to_owned(),
        player: entity.attribute("player").and_then(|v| v.as_int()),
        state: state.to_owned(),
    })
}
