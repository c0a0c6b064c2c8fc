//! Component trait, type keys, and the factory registry.
//!
//! Entities are assembled from components developed independently of one
//! another. Each concrete component declares a stable numeric key (used
//! for lookup on the entity) and a registry name (used by templates).
//! Keys live in disjoint bands by convention: framework components under
//! [`keys::FRAMEWORK_BAND`], game components under [`keys::GAME_BAND`].
//!
//! The registry is an explicit object built during startup and handed to
//! the entity manager rather than a global mutable table, so tests can
//! build a registry containing only the components they exercise.

use std::any::Any;
use std::collections::HashMap;

use crate::error::{Result, SimError};
use crate::manager::{InitCtx, UpdateCtx};
use crate::property::PropertyBag;
use crate::render::{RenderCtx, RenderFrame};

/// Stable numeric identifier for a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey(pub u32);

impl std::fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Well-known component keys, grouped in disjoint numeric bands.
pub mod keys {
    use super::ComponentKey;

    /// Base of the framework component band.
    pub const FRAMEWORK_BAND: u32 = 0x100;
    /// Base of the game component band.
    pub const GAME_BAND: u32 = 0x200;

    /// Pose storage (position + heading).
    pub const POSITION: ComponentKey = ComponentKey(FRAMEWORK_BAND);
    /// Steering toward a goal position.
    pub const MOVEABLE: ComponentKey = ComponentKey(FRAMEWORK_BAND + 1);
    /// Waypoint path following.
    pub const PATHING: ComponentKey = ComponentKey(FRAMEWORK_BAND + 2);
    /// Ranged weapon with cooldown.
    pub const WEAPON: ComponentKey = ComponentKey(GAME_BAND);
}

/// A unit of entity behavior.
///
/// Every hook is optional; a component that needs no per-frame behavior
/// simply leaves `update` defaulted. Components hold no owning references
/// to siblings: they look each other up through the entity each time,
/// because components may be attached in any order and removed at runtime.
pub trait Component: 'static {
    /// The component's type key, used for lookup on the entity.
    fn key(&self) -> ComponentKey;

    /// Apply template (or override) properties to the component.
    ///
    /// Called before `initialize`, possibly more than once. Unknown keys
    /// are ignored; a known key with an invalid value is a configuration
    /// error that aborts entity creation.
    fn apply_template(&mut self, props: &PropertyBag) -> Result<()> {
        let _ = props;
        Ok(())
    }

    /// Called once all components exist on the entity, in template
    /// declaration order. Sibling lookups are safe here.
    fn initialize(&mut self, ctx: &InitCtx<'_>) {
        let _ = ctx;
    }

    /// Advance the component by `dt` seconds of simulation time.
    fn update(&mut self, dt: f32, ctx: &mut UpdateCtx<'_>) {
        let _ = (dt, ctx);
    }

    /// Contribute render state for the current frame.
    ///
    /// Runs on the simulation thread after the update pass; the collected
    /// frame is published atomically for the render thread.
    fn collect_render(&self, ctx: &RenderCtx<'_>, frame: &mut RenderFrame) {
        let _ = (ctx, frame);
    }

    /// Upcast for type-checked downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for type-checked downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Compile-time metadata for a concrete component type.
///
/// Implemented alongside [`Component`] so lookups can be written as
/// `entity.component::<MoveableComponent>()`.
pub trait ComponentKind: Component + Sized {
    /// The type key shared by all instances.
    const KEY: ComponentKey;
    /// Registry / template name.
    const NAME: &'static str;
}

/// Zero-argument component constructor stored in the registry.
pub type ComponentCtor = Box<dyn Fn() -> Box<dyn Component>>;

/// Factory registry mapping template component names to constructors.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: HashMap<String, (ComponentKey, ComponentCtor)>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in component registered.
    #[must_use]
    pub fn standard() -> Self {
        use crate::components::{
            MoveableComponent, PathingComponent, PositionComponent, WeaponComponent,
        };
        let mut registry = Self::new();
        registry
            .register::<PositionComponent>()
            .expect("fresh registry");
        registry
            .register::<MoveableComponent>()
            .expect("fresh registry");
        registry
            .register::<PathingComponent>()
            .expect("fresh registry");
        registry
            .register::<WeaponComponent>()
            .expect("fresh registry");
        registry
    }

    /// Register a component type under its [`ComponentKind::NAME`].
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already taken.
    pub fn register<T: ComponentKind + Default>(&mut self) -> Result<()> {
        self.register_with(T::NAME, T::KEY, || Box::<T>::default())
    }

    /// Register a custom constructor under an explicit name and key.
    ///
    /// Useful for test components that capture probes.
    pub fn register_with(
        &mut self,
        name: &str,
        key: ComponentKey,
        ctor: impl Fn() -> Box<dyn Component> + 'static,
    ) -> Result<()> {
        if self.factories.contains_key(name) {
            return Err(SimError::DuplicateRegistration(name.to_owned()));
        }
        self.factories
            .insert(name.to_owned(), (key, Box::new(ctor)));
        Ok(())
    }

    /// Instantiate a component by template name.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownComponent`] if no factory is registered.
    pub fn create(&self, name: &str) -> Result<Box<dyn Component>> {
        self.factories
            .get(name)
            .map(|(_, ctor)| ctor())
            .ok_or_else(|| SimError::UnknownComponent(name.to_owned()))
    }

    /// Check whether a name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// The key a registered name maps to.
    #[must_use]
    pub fn key_of(&self, name: &str) -> Option<ComponentKey> {
        self.factories.get(name).map(|(key, _)| *key)
    }

    /// Number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("registered", &self.factories.len())
            .finish()
    }
}
