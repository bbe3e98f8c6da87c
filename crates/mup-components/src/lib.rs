//! MUP components: the server-side model of UI component trees.
//!
//! This crate holds everything about components that does not depend on a
//! connection: the [`ComponentRecord`] shape sent to clients, pure builder
//! functions for the standard component types, field validators, and the
//! in-memory [`ComponentRegistry`] that batch operations and event handlers
//! mutate.

pub mod builder;
pub mod component;
pub mod error;
pub mod registry;
pub mod validation;

pub use builder::ComponentBuilder;
pub use component::{ComponentRecord, Map, COMPONENT_VERSION, SERVER_ID};
pub use error::{ComponentError, ComponentResult};
pub use registry::{ComponentRegistry, Compensation, Section};
pub use validation::{FieldRule, FieldValidator, ValidationOutcome};
