//! Error types for the simulation core.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum SimError {
    /// No template registered under the requested name.
    #[error("Unknown entity template: {0}")]
    UnknownTemplate(String),

    /// A template names a component type with no registered factory.
    #[error("Component type not registered: {0}")]
    UnknownComponent(String),

    /// A template or registry entry was registered twice.
    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    /// A template lists the same component type more than once.
    #[error("Template '{template}' attaches component '{component}' twice")]
    DuplicateComponent {
        /// Template being instantiated.
        template: String,
        /// Component type listed twice.
        component: String,
    },

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u64),

    /// An operation requires a component the entity does not carry.
    #[error("Entity {entity} has no '{component}' component")]
    MissingComponent {
        /// Entity the operation targeted.
        entity: u64,
        /// Component type or key the operation needed.
        component: String,
    },

    /// A template property had the wrong type or an invalid value.
    #[error("Invalid template property '{key}': {message}")]
    InvalidProperty {
        /// Property key that failed to apply.
        key: String,
        /// What went wrong.
        message: String,
    },

    /// Template file could not be read.
    #[error("Failed to read template file '{path}': {source}")]
    TemplateIo {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Template file could not be parsed.
    #[error("Failed to parse template file '{path}': {message}")]
    TemplateParse {
        /// Path to the file (or `<inline>` for string input).
        path: String,
        /// Parser error message.
        message: String,
    },
}
