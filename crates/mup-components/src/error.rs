//! Error types for component construction and registry access.

use thiserror::Error;

/// Errors raised by the component registry and tree construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// No component with the given id is registered.
    #[error("Component not found: {0}")]
    NotFound(String),

    /// A component tree failed structural validation.
    #[error("Invalid component tree: {0}")]
    InvalidTree(String),
}

/// Convenience alias for component results.
pub type ComponentResult<T> = Result<T, ComponentError>;
