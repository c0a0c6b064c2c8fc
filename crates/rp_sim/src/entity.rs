//! Entities: an identity plus a keyed collection of components.
//!
//! Components are stored in attachment order (the template's declaration
//! order) behind `RefCell`, so a component being updated can look up and
//! mutate its siblings through a shared `&Entity`. At most one component
//! per [`ComponentKey`] can be attached.

use std::cell::{Ref, RefCell, RefMut};

use crate::attribute::{AttributeSet, ObserverId};
use crate::component::{Component, ComponentKey, ComponentKind};
use crate::error::{Result, SimError};
use crate::property::PropertyValue;

/// Unique identifier for entities. Never reused within a process.
pub type EntityId = u64;

/// Reserved invalid entity id.
pub const INVALID_ENTITY: EntityId = 0;

/// A live game entity.
pub struct Entity {
    id: EntityId,
    kind: String,
    components: Vec<(ComponentKey, RefCell<Box<dyn Component>>)>,
    attributes: RefCell<AttributeSet>,
}

impl Entity {
    /// Create an entity shell with no components.
    pub(crate) fn new(id: EntityId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            components: Vec::new(),
            attributes: RefCell::new(AttributeSet::new()),
        }
    }

    /// The entity's unique id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The template name this entity was created from.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Attach a component. Fails if a component with the same key is
    /// already present; `name` is only used for the error message.
    pub(crate) fn attach(
        &mut self,
        name: &str,
        component: Box<dyn Component>,
    ) -> Result<()> {
        let key = component.key();
        if self.components.iter().any(|(k, _)| *k == key) {
            return Err(SimError::DuplicateComponent {
                template: self.kind.clone(),
                component: name.to_owned(),
            });
        }
        self.components.push((key, RefCell::new(component)));
        Ok(())
    }

    /// Detach the component under `key`, returning it if present.
    ///
    /// Sibling components holding the key as a back-reference simply get
    /// `None` from their next lookup.
    pub(crate) fn detach(&mut self, key: ComponentKey) -> Option<Box<dyn Component>> {
        let index = self.components.iter().position(|(k, _)| *k == key)?;
        Some(self.components.remove(index).1.into_inner())
    }

    /// Check for a component by key.
    #[must_use]
    pub fn has_key(&self, key: ComponentKey) -> bool {
        self.components.iter().any(|(k, _)| *k == key)
    }

    /// Check for a component by type.
    #[must_use]
    pub fn has<T: ComponentKind>(&self) -> bool {
        self.has_key(T::KEY)
    }

    fn cell(&self, key: ComponentKey) -> Option<&RefCell<Box<dyn Component>>> {
        self.components
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, cell)| cell)
    }

    /// Borrow a component by type.
    ///
    /// Returns `None` if the component is absent, registered under the
    /// key with a different concrete type, or currently borrowed mutably
    /// (a component cannot look itself up during its own update).
    #[must_use]
    pub fn component<T: ComponentKind>(&self) -> Option<Ref<'_, T>> {
        let guard = self.cell(T::KEY)?.try_borrow().ok()?;
        if guard.as_any().is::<T>() {
            Some(Ref::map(guard, |c| {
                c.as_any().downcast_ref::<T>().expect("type checked above")
            }))
        } else {
            None
        }
    }

    /// Mutably borrow a component by type. Same soft-failure rules as
    /// [`Entity::component`].
    #[must_use]
    pub fn component_mut<T: ComponentKind>(&self) -> Option<RefMut<'_, T>> {
        let guard = self.cell(T::KEY)?.try_borrow_mut().ok()?;
        if guard.as_any().is::<T>() {
            Some(RefMut::map(guard, |c| {
                c.as_any_mut()
                    .downcast_mut::<T>()
                    .expect("type checked above")
            }))
        } else {
            None
        }
    }

    /// Iterate components in attachment order. Used by the manager for
    /// the update pass and render collection.
    pub(crate) fn components_in_order(
        &self,
    ) -> impl Iterator<Item = (ComponentKey, &RefCell<Box<dyn Component>>)> {
        self.components.iter().map(|(k, cell)| (*k, cell))
    }

    /// Number of attached components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Current value of a named attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<PropertyValue> {
        self.attributes.borrow().get(name).cloned()
    }

    /// Write a named attribute.
    ///
    /// The first write locks the attribute's value type; a later write
    /// with a mismatched type is rejected and logged, leaving the prior
    /// value in place. Observers fire synchronously after a successful
    /// write. Returns whether the write was applied.
    pub fn set_attribute(&self, name: &str, value: PropertyValue) -> bool {
        let outcome = self.attributes.borrow_mut().set(name, value.clone());
        match outcome {
            Ok(observers) => {
                // Borrow released above; observers may read attributes.
                for observer in observers {
                    observer(&value);
                }
                true
            }
            Err(mismatch) => {
                tracing::warn!(
                    entity = self.id,
                    attribute = name,
                    expected = mismatch.expected,
                    got = mismatch.got,
                    "attribute write rejected: type mismatch"
                );
                false
            }
        }
    }

    /// Seed an attribute without observer notification (template setup).
    pub(crate) fn seed_attribute(&self, name: &str, value: PropertyValue) {
        self.attributes.borrow_mut().seed(name, value);
    }

    /// Subscribe to changes of a named attribute.
    pub fn subscribe_attribute(
        &self,
        name: &str,
        observer: impl Fn(&PropertyValue) + 'static,
    ) -> ObserverId {
        self.attributes.borrow_mut().subscribe(name, observer)
    }

    /// Remove an attribute subscription.
    pub fn unsubscribe_attribute(&self, name: &str, id: ObserverId) -> bool {
        self.attributes.borrow_mut().unsubscribe(name, id)
    }

    /// Names of all attributes currently set.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes
            .borrow()
            .names()
            .map(str::to_owned)
            .collect()
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("components", &self.components.len())
            .finish()
    }
}
