//! Entity ownership, template instantiation, and the per-tick update pass.
//!
//! The manager owns every live entity and drives the simulation's update
//! protocol:
//!
//! 1. Drain marshalled pathfinder responses (the only asynchronous input).
//! 2. Snapshot a position lookup for cross-entity queries.
//! 3. Visit entities in ascending id order and invoke every component's
//!    `update`. Destroys and spawns requested by components go to pending
//!    buffers; iteration never mutates the entity set in place.
//! 4. Apply pending destroys, then pending spawns.
//! 5. Collect and publish the render frame.
//!
//! Iteration order is sorted by id so a given world state always updates
//! the same way.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::component::ComponentRegistry;
use crate::entity::{Entity, EntityId};
use crate::error::{Result, SimError};
use crate::math::Vec3;
use crate::pathfinder::Pathfinder;
use crate::property::PropertyBag;
use crate::render::{render_handle, RenderCtx, RenderFrame, RenderHandle};
use crate::template::TemplateLibrary;
use crate::update_queue::UpdateQueue;

/// The deferred-action queue type used by the simulation.
pub type SimQueue = UpdateQueue<EntityManager>;

/// Read-only snapshot of entity positions taken at the start of a tick.
///
/// Components use this for cross-entity queries (targeting, avoidance)
/// instead of touching other entities' state mid-pass.
#[derive(Debug, Default)]
pub struct PositionLookup {
    positions: Vec<(EntityId, Vec3)>,
}

impl PositionLookup {
    /// Position of an entity, if it was live and positioned at tick start.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<Vec3> {
        self.positions
            .iter()
            .find(|(other, _)| *other == id)
            .map(|(_, pos)| *pos)
    }

    /// Whether an entity had a position at tick start. Doubles as the
    /// liveness check for id-based back-references.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Entities within `radius` of `center` on the x/y plane, excluding
    /// `exclude` (normally the querying entity itself).
    #[must_use]
    pub fn nearby(&self, center: Vec3, radius: f32, exclude: EntityId) -> Vec<(EntityId, Vec3)> {
        self.positions
            .iter()
            .filter(|(id, pos)| {
                *id != exclude && crate::math::flat_distance(center, *pos) <= radius
            })
            .copied()
            .collect()
    }

    /// All recorded positions, ascending by entity id.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, Vec3)> + '_ {
        self.positions.iter().copied()
    }
}

/// Deferred structural mutations requested during an update pass.
#[derive(Default)]
struct OpsBuffer {
    destroyed: HashSet<EntityId>,
    destroy_order: Vec<EntityId>,
    spawns: Vec<(String, PropertyBag)>,
}

/// Context handed to `Component::initialize`.
///
/// All of the entity's components exist by the time this runs, so sibling
/// lookups through `entity` are safe.
pub struct InitCtx<'a> {
    /// Id of the entity being initialized.
    pub id: EntityId,
    /// The entity, for sibling lookups.
    pub entity: &'a Entity,
}

/// Context handed to `Component::update` each tick.
pub struct UpdateCtx<'a> {
    /// Id of the entity being updated.
    pub id: EntityId,
    /// The entity, for sibling lookups.
    pub entity: &'a Entity,
    /// Deferred-action scheduler; drained after the update pass.
    pub queue: &'a mut SimQueue,
    /// Position snapshot taken at the start of this tick.
    pub positions: &'a PositionLookup,
    /// Path-find service for issuing asynchronous requests.
    pub pathfinder: &'a dyn Pathfinder,
    ops: &'a mut OpsBuffer,
}

impl UpdateCtx<'_> {
    /// Request destruction of an entity. Applied after the full pass;
    /// the target receives no further updates this tick.
    pub fn destroy(&mut self, id: EntityId) {
        if self.ops.destroyed.insert(id) {
            self.ops.destroy_order.push(id);
        }
    }

    /// Request creation of an entity from a template. Applied after the
    /// full pass; the new entity is first updated next tick.
    pub fn spawn(&mut self, template: &str, overrides: PropertyBag) {
        self.ops.spawns.push((template.to_owned(), overrides));
    }
}

/// Owner of all live entities.
pub struct EntityManager {
    registry: ComponentRegistry,
    templates: TemplateLibrary,
    pathfinder: Rc<dyn Pathfinder>,
    entities: HashMap<EntityId, Entity>,
    next_id: EntityId,
    tick: u64,
    render: RenderHandle,
}

impl EntityManager {
    /// Create a manager over an explicit registry, template library, and
    /// path-find service.
    #[must_use]
    pub fn new(
        registry: ComponentRegistry,
        templates: TemplateLibrary,
        pathfinder: Rc<dyn Pathfinder>,
    ) -> Self {
        Self {
            registry,
            templates,
            pathfinder,
            entities: HashMap::new(),
            next_id: 1,
            tick: 0,
            render: render_handle(),
        }
    }

    /// Number of completed update passes.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check whether no entities are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Look up a live entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Whether an entity id refers to a live entity.
    #[must_use]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Live entity ids in ascending order.
    #[must_use]
    pub fn ids_sorted(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Handle to the published render frames, for the render thread.
    #[must_use]
    pub fn render_handle(&self) -> RenderHandle {
        self.render.clone()
    }

    /// The path-find service the manager dispatches to.
    #[must_use]
    pub fn pathfinder(&self) -> &dyn Pathfinder {
        &*self.pathfinder
    }

    /// Create an entity from a registered template.
    ///
    /// Every listed component is constructed through the factory registry
    /// and receives the template's property bag, then `overrides`. Once
    /// all components are attached and the template's attributes are
    /// seeded (overridable by matching keys in `overrides`), each
    /// component's `initialize` runs in template declaration order.
    ///
    /// # Errors
    ///
    /// Fails without creating anything if the template is unknown, a
    /// component type is unregistered, a property is invalid, or the
    /// template lists a component type twice.
    pub fn create_entity(&mut self, template_name: &str, overrides: &PropertyBag) -> Result<EntityId> {
        let template = self
            .templates
            .get(template_name)
            .ok_or_else(|| SimError::UnknownTemplate(template_name.to_owned()))?
            .clone();

        // Construct and configure every component before touching the
        // live set, so failures leave the manager untouched.
        let mut built = Vec::with_capacity(template.components.len());
        for spec in &template.components {
            let mut component = self.registry.create(&spec.component)?;
            component.apply_template(&spec.properties)?;
            if !overrides.is_empty() {
                component.apply_template(overrides)?;
            }
            built.push((spec.component.clone(), component));
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut entity = Entity::new(id, &template.name);
        for (name, component) in built {
            entity.attach(&name, component)?;
        }
        for (name, value) in template.attributes.iter() {
            let value = overrides.get(name).unwrap_or(value);
            entity.seed_attribute(name, value.clone());
        }

        self.entities.insert(id, entity);

        let entity = self.entities.get(&id).expect("just inserted");
        for (_, cell) in entity.components_in_order() {
            let mut component = cell.borrow_mut();
            component.initialize(&InitCtx { id, entity });
        }

        tracing::debug!(id, template = template_name, "entity created");
        Ok(id)
    }

    /// Destroy an entity immediately.
    ///
    /// Must not be called from inside the update pass; components use
    /// [`UpdateCtx::destroy`] there. After this returns, lookups for the
    /// id yield `None` and none of its components are updated again.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EntityNotFound`] if the id is not live.
    pub fn destroy_entity(&mut self, id: EntityId) -> Result<()> {
        if self.entities.remove(&id).is_some() {
            tracing::debug!(id, "entity destroyed");
            Ok(())
        } else {
            Err(SimError::EntityNotFound(id))
        }
    }

    /// Detach a component from a live entity.
    ///
    /// The component is dropped; subsequent lookups under the key return
    /// `None`, which is how sibling back-references discover the removal.
    ///
    /// # Errors
    ///
    /// [`SimError::EntityNotFound`] for a dead id,
    /// [`SimError::MissingComponent`] if no component holds the key.
    pub fn detach_component(
        &mut self,
        id: EntityId,
        key: crate::component::ComponentKey,
    ) -> Result<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SimError::EntityNotFound(id))?;
        entity
            .detach(key)
            .map(|_| ())
            .ok_or_else(|| SimError::MissingComponent {
                entity: id,
                component: key.to_string(),
            })
    }

    /// Order an entity to move to `goal`.
    ///
    /// Routes through the pathing component when present (asynchronous
    /// path request); otherwise falls back to steering straight at the
    /// goal through the moveable component.
    ///
    /// # Errors
    ///
    /// [`SimError::EntityNotFound`] for a dead id,
    /// [`SimError::MissingComponent`] if the entity cannot move.
    pub fn order_move(&self, id: EntityId, goal: Vec3) -> Result<()> {
        use crate::components::{MoveableComponent, PathingComponent};

        let entity = self.entities.get(&id).ok_or(SimError::EntityNotFound(id))?;

        if let Some(mut pathing) = entity.component_mut::<PathingComponent>() {
            pathing.set_goal(goal, entity, &*self.pathfinder);
            return Ok(());
        }
        if let Some(mut moveable) = entity.component_mut::<MoveableComponent>() {
            moveable.set_goal(goal);
            return Ok(());
        }
        Err(SimError::MissingComponent {
            entity: id,
            component: "moveable".to_owned(),
        })
    }

    /// Snapshot positions of every live, positioned entity.
    #[must_use]
    pub fn position_lookup(&self) -> PositionLookup {
        use crate::components::PositionComponent;

        let mut positions = Vec::with_capacity(self.entities.len());
        for id in self.ids_sorted() {
            if let Some(entity) = self.entities.get(&id) {
                if let Some(position) = entity.component::<PositionComponent>() {
                    positions.push((id, position.position));
                }
            }
        }
        PositionLookup { positions }
    }

    /// Run one update pass.
    ///
    /// Every entity live at the start of the pass is visited at most once,
    /// in ascending id order. An entity flagged for destruction during the
    /// pass is skipped for the rest of the pass and removed afterwards;
    /// no other entity's visit is skipped or repeated. The deferred queue
    /// is *not* drained here; the simulation facade drains it right after
    /// this pass.
    pub fn update(&mut self, dt: f32, queue: &mut SimQueue) {
        self.drain_path_results();

        let positions = self.position_lookup();
        let ids = self.ids_sorted();
        let mut ops = OpsBuffer::default();

        for id in ids {
            if ops.destroyed.contains(&id) {
                continue;
            }
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            for (_, cell) in entity.components_in_order() {
                if ops.destroyed.contains(&id) {
                    break;
                }
                let Ok(mut component) = cell.try_borrow_mut() else {
                    continue;
                };
                let mut ctx = UpdateCtx {
                    id,
                    entity,
                    queue: &mut *queue,
                    positions: &positions,
                    pathfinder: &*self.pathfinder,
                    ops: &mut ops,
                };
                component.update(dt, &mut ctx);
            }
        }

        for id in ops.destroy_order {
            if self.entities.remove(&id).is_some() {
                tracing::debug!(id, "entity destroyed");
            }
        }
        for (template, overrides) in ops.spawns {
            if let Err(err) = self.create_entity(&template, &overrides) {
                tracing::warn!(%err, template = %template, "deferred spawn failed");
            }
        }

        self.tick += 1;
        self.publish_render();
    }

    /// Route completed path responses to their pathing components.
    ///
    /// Responses for dead entities, or whose sequence number no longer
    /// matches the component's current request, are dropped silently.
    fn drain_path_results(&mut self) {
        use crate::components::PathingComponent;

        for response in self.pathfinder.poll() {
            let Some(entity) = self.entities.get(&response.entity) else {
                continue;
            };
            let Some(mut pathing) = entity.component_mut::<PathingComponent>() else {
                continue;
            };
            pathing.on_path_result(response.seq, response.outcome, entity);
        }
    }

    /// Assemble this tick's render frame and publish it in one write.
    fn publish_render(&self) {
        let mut frame = RenderFrame {
            tick: self.tick,
            entries: Vec::new(),
        };
        for id in self.ids_sorted() {
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            let ctx = RenderCtx {
                id,
                kind: entity.kind(),
            };
            for (_, cell) in entity.components_in_order() {
                if let Ok(component) = cell.try_borrow() {
                    component.collect_render(&ctx, &mut frame);
                }
            }
        }
        *self.render.write() = frame;
    }
}

impl std::fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManager")
            .field("entities", &self.entities.len())
            .field("tick", &self.tick)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathfinder::ImmediatePathfinder;
    use crate::property::PropertyValue;

    fn manager() -> EntityManager {
        EntityManager::new(
            ComponentRegistry::standard(),
            TemplateLibrary::standard(),
            Rc::new(ImmediatePathfinder::default()),
        )
    }

    #[test]
    fn test_create_from_template() {
        let mut mgr = manager();
        let id = mgr.create_entity("scout", &PropertyBag::new()).unwrap();

        assert_eq!(id, 1);
        let entity = mgr.entity(id).unwrap();
        assert_eq!(entity.kind(), "scout");
        assert_eq!(entity.component_count(), 3);
        assert_eq!(entity.attribute("health"), Some(PropertyValue::Int(40)));
    }

    #[test]
    fn test_unknown_template_creates_nothing() {
        let mut mgr = manager();
        assert!(matches!(
            mgr.create_entity("battlecruiser", &PropertyBag::new()),
            Err(SimError::UnknownTemplate(_))
        ));
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_unregistered_component_creates_nothing() {
        let mut templates = TemplateLibrary::new();
        templates
            .register(
                crate::template::EntityTemplate::new("ghost")
                    .with_component(crate::template::ComponentSpec::new("position"))
                    .with_component(crate::template::ComponentSpec::new("phase_shift")),
            )
            .unwrap();
        let mut mgr = EntityManager::new(
            ComponentRegistry::standard(),
            templates,
            Rc::new(ImmediatePathfinder::default()),
        );

        assert!(matches!(
            mgr.create_entity("ghost", &PropertyBag::new()),
            Err(SimError::UnknownComponent(name)) if name == "phase_shift"
        ));
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_override_applies_to_components_and_attributes() {
        let mut mgr = manager();
        let overrides = PropertyBag::new().with("speed", 9.0).with("health", 5i64);
        let id = mgr.create_entity("scout", &overrides).unwrap();

        let entity = mgr.entity(id).unwrap();
        assert_eq!(entity.attribute("health"), Some(PropertyValue::Int(5)));
        let moveable = entity
            .component::<crate::components::MoveableComponent>()
            .unwrap();
        assert_eq!(moveable.speed, 9.0);
    }

    #[test]
    fn test_destroy_invalidates_lookup() {
        let mut mgr = manager();
        let id = mgr.create_entity("crate", &PropertyBag::new()).unwrap();

        mgr.destroy_entity(id).unwrap();
        assert!(mgr.entity(id).is_none());
        assert!(matches!(
            mgr.destroy_entity(id),
            Err(SimError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_detach_component_empties_lookup() {
        let mut mgr = manager();
        let id = mgr.create_entity("scout", &PropertyBag::new()).unwrap();

        mgr.detach_component(id, crate::component::keys::MOVEABLE)
            .unwrap();
        let entity = mgr.entity(id).unwrap();
        assert!(entity
            .component::<crate::components::MoveableComponent>()
            .is_none());
        assert!(entity.component::<crate::components::PositionComponent>().is_some());

        assert!(matches!(
            mgr.detach_component(id, crate::component::keys::MOVEABLE),
            Err(SimError::MissingComponent { .. })
        ));
    }

    #[test]
    fn test_ids_are_unique_and_ascending() {
        let mut mgr = manager();
        let a = mgr.create_entity("crate", &PropertyBag::new()).unwrap();
        let b = mgr.create_entity("crate", &PropertyBag::new()).unwrap();
        mgr.destroy_entity(a).unwrap();
        let c = mgr.create_entity("crate", &PropertyBag::new()).unwrap();

        assert!(a < b && b < c, "ids are never reused");
    }

    #[test]
    fn test_position_lookup_snapshot() {
        let mut mgr = manager();
        let a = mgr
            .create_entity("crate", &PropertyBag::new().with("x", 3.0))
            .unwrap();
        let lookup = mgr.position_lookup();

        assert_eq!(lookup.get(a), Some(Vec3::new(3.0, 0.0, 0.0)));
        assert!(lookup.contains(a));
        assert!(!lookup.contains(999));
        assert_eq!(lookup.nearby(Vec3::ZERO, 10.0, a).len(), 0);
    }

    #[test]
    fn test_render_frame_published_each_tick() {
        let mut mgr = manager();
        mgr.create_entity("crate", &PropertyBag::new()).unwrap();
        let handle = mgr.render_handle();

        let mut queue = SimQueue::new();
        mgr.update(0.1, &mut queue);

        let frame = crate::render::read_frame(&handle);
        assert_eq!(frame.tick, 1);
        assert_eq!(frame.entries.len(), 1);
        assert_eq!(frame.entries[0].kind, "crate");
    }
}
