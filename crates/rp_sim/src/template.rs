//! Data-driven entity templates.
//!
//! A template is an ordered list of component descriptors (type name plus
//! a property bag) and a set of seed attributes. Templates are defined in
//! RON and validated when registered; the library also ships a built-in
//! standard set used by tests and the headless runner.
//!
//! # Example RON
//!
//! ```ron
//! [
//!     (
//!         name: "scout",
//!         components: [
//!             (component: "position"),
//!             (component: "moveable", properties: { "speed": 5.0 }),
//!             (component: "pathing"),
//!         ],
//!         attributes: { "health": 40, "player": 0 },
//!     ),
//! ]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::property::PropertyBag;

/// One component entry in a template: the factory name and the properties
/// applied to the freshly constructed component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Registered component type name.
    pub component: String,
    /// Properties applied via `apply_template`.
    #[serde(default)]
    pub properties: PropertyBag,
}

impl ComponentSpec {
    /// Spec with an empty property bag.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            properties: PropertyBag::new(),
        }
    }

    /// Spec with the given properties.
    #[must_use]
    pub fn with_properties(component: impl Into<String>, properties: PropertyBag) -> Self {
        Self {
            component: component.into(),
            properties,
        }
    }
}

/// A named entity template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTemplate {
    /// Template name, unique within a library.
    pub name: String,
    /// Components in declaration order; instantiation and `initialize`
    /// both follow this order.
    pub components: Vec<ComponentSpec>,
    /// Attributes seeded onto the entity before `initialize` runs.
    #[serde(default)]
    pub attributes: PropertyBag,
}

impl EntityTemplate {
    /// Template with no components or attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            attributes: PropertyBag::new(),
        }
    }

    /// Builder-style component append.
    #[must_use]
    pub fn with_component(mut self, spec: ComponentSpec) -> Self {
        self.components.push(spec);
        self
    }

    /// Builder-style attribute seed.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<crate::property::PropertyValue>,
    ) -> Self {
        self.attributes.insert(name, value);
        self
    }
}

/// Registry of entity templates by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: HashMap<String, EntityTemplate>,
}

impl TemplateLibrary {
    /// Create an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in template set: a fast scout, a slower harvester that
    /// avoids collisions, a static turret, and an inert supply crate.
    #[must_use]
    pub fn standard() -> Self {
        let mut library = Self::new();
        let standard = [
            EntityTemplate::new("scout")
                .with_component(ComponentSpec::new("position"))
                .with_component(ComponentSpec::with_properties(
                    "moveable",
                    PropertyBag::new().with("speed", 5.0),
                ))
                .with_component(ComponentSpec::new("pathing"))
                .with_attribute("health", 40i64)
                .with_attribute("player", 0i64),
            EntityTemplate::new("harvester")
                .with_component(ComponentSpec::new("position"))
                .with_component(ComponentSpec::with_properties(
                    "moveable",
                    PropertyBag::new()
                        .with("speed", 3.0)
                        .with("avoid_collisions", true),
                ))
                .with_component(ComponentSpec::new("pathing"))
                .with_attribute("health", 60i64)
                .with_attribute("player", 0i64),
            EntityTemplate::new("turret")
                .with_component(ComponentSpec::new("position"))
                .with_component(ComponentSpec::with_properties(
                    "weapon",
                    PropertyBag::new()
                        .with("range", 6.0)
                        .with("damage", 10i64)
                        .with("cooldown", 1.5),
                ))
                .with_attribute("health", 100i64)
                .with_attribute("player", 0i64),
            EntityTemplate::new("crate")
                .with_component(ComponentSpec::new("position"))
                .with_attribute("health", 20i64),
        ];
        for template in standard {
            library.register(template).expect("standard set is distinct");
        }
        library
    }

    /// Register a template.
    ///
    /// # Errors
    ///
    /// Returns an error if a template with the same name already exists.
    pub fn register(&mut self, template: EntityTemplate) -> Result<()> {
        if self.templates.contains_key(&template.name) {
            return Err(SimError::DuplicateRegistration(template.name));
        }
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    /// Look up a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EntityTemplate> {
        self.templates.get(name)
    }

    /// Check whether a template is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Registered template names, in unspecified order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Parse a template list from RON text and register every entry.
    ///
    /// # Errors
    ///
    /// Returns a parse error or a duplicate-name registration error.
    pub fn load_ron_str(&mut self, text: &str) -> Result<()> {
        let parsed: Vec<EntityTemplate> =
            ron::from_str(text).map_err(|err| SimError::TemplateParse {
                path: "<inline>".to_owned(),
                message: err.to_string(),
            })?;
        for template in parsed {
            self.register(template)?;
        }
        Ok(())
    }

    /// Read and register a RON template file.
    ///
    /// # Errors
    ///
    /// Returns an IO error, a parse error, or a duplicate-name error.
    pub fn load_ron_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SimError::TemplateIo {
            path: path.display().to_string(),
            source,
        })?;
        let parsed: Vec<EntityTemplate> =
            ron::from_str(&text).map_err(|err| SimError::TemplateParse {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        for template in parsed {
            self.register(template)?;
        }
        Ok(())
    }
}
