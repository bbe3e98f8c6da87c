//! Batch operation engine.

pub mod engine;
pub mod operation;

pub use engine::BatchEngine;
pub use operation::{Operation, OperationKind};
