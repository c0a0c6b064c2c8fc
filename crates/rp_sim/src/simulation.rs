//! The simulation facade: entity manager plus deferred-action queue.
//!
//! Each call to [`Simulation::tick`] runs the entity update pass and then
//! drains the queue, in that order, so deferred actions always observe
//! the post-pass world and structural changes they make are visible to
//! the next pass.
//!
//! # Example
//!
//! ```
//! use rp_sim::prelude::*;
//! use std::rc::Rc;
//!
//! let mut sim = Simulation::new(
//!     ComponentRegistry::standard(),
//!     TemplateLibrary::standard(),
//!     Rc::new(ImmediatePathfinder::default()),
//! );
//!
//! let scout = sim
//!     .manager_mut()
//!     .create_entity("scout", &PropertyBag::new())
//!     .unwrap();
//! sim.manager().order_move(scout, Vec3::new(10.5, 0.5, 0.0)).unwrap();
//!
//! for _ in 0..100 {
//!     sim.tick(0.05);
//! }
//! assert!(sim.manager().is_live(scout));
//! ```

use std::rc::Rc;

use crate::component::ComponentRegistry;
use crate::manager::{EntityManager, SimQueue};
use crate::pathfinder::Pathfinder;
use crate::template::TemplateLibrary;

/// The top-level simulation driver.
pub struct Simulation {
    manager: EntityManager,
    queue: SimQueue,
}

impl Simulation {
    /// Build a simulation from its collaborators.
    #[must_use]
    pub fn new(
        registry: ComponentRegistry,
        templates: TemplateLibrary,
        pathfinder: Rc<dyn Pathfinder>,
    ) -> Self {
        Self {
            manager: EntityManager::new(registry, templates, pathfinder),
            queue: SimQueue::new(),
        }
    }

    /// Wrap an already-built manager.
    #[must_use]
    pub fn from_manager(manager: EntityManager) -> Self {
        Self {
            manager,
            queue: SimQueue::new(),
        }
    }

    /// The entity manager.
    #[must_use]
    pub fn manager(&self) -> &EntityManager {
        &self.manager
    }

    /// Mutable access to the entity manager (entity creation, explicit
    /// destruction).
    pub fn manager_mut(&mut self) -> &mut EntityManager {
        &mut self.manager
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.manager.tick_count()
    }

    /// Simulation clock in seconds, as accumulated by the queue.
    #[must_use]
    pub fn clock(&self) -> f64 {
        self.queue.clock()
    }

    /// Schedule a deferred action `timeout` seconds from now.
    pub fn schedule<F>(&mut self, timeout: f64, action: F)
    where
        F: FnOnce(&mut EntityManager, &mut SimQueue) + 'static,
    {
        self.queue.push(timeout, action);
    }

    /// Advance the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.manager.update(dt, &mut self.queue);
        self.queue.update(f64::from(dt), &mut self.manager);
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("manager", &self.manager)
            .field("queue", &self.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathfinder::ImmediatePathfinder;
    use crate::property::PropertyBag;

    fn sim() -> Simulation {
        Simulation::new(
            ComponentRegistry::standard(),
            TemplateLibrary::standard(),
            Rc::new(ImmediatePathfinder::default()),
        )
    }

    #[test]
    fn test_tick_advances_counters() {
        let mut sim = sim();
        sim.tick(0.5);
        sim.tick(0.5);
        assert_eq!(sim.tick_count(), 2);
        assert!((sim.clock() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_scheduled_action_sees_post_pass_world() {
        let mut sim = sim();
        sim.manager_mut()
            .create_entity("crate", &PropertyBag::new())
            .unwrap();

        sim.schedule(0.0, |mgr, _| {
            let id = mgr.ids_sorted()[0];
            let _ = mgr.destroy_entity(id);
        });

        sim.tick(0.1);
        assert!(sim.manager().is_empty());
    }

    #[test]
    fn test_deferred_spawn_via_schedule() {
        let mut sim = sim();
        sim.schedule(1.0, |mgr, _| {
            mgr.create_entity("crate", &PropertyBag::new()).unwrap();
        });

        sim.tick(0.5);
        assert!(sim.manager().is_empty());
        sim.tick(0.5);
        assert_eq!(sim.manager().len(), 1);
    }
}
