//! Registro de workflows y definiciones inmutables.

pub mod definition;
pub mod registry;

pub use definition::{WorkflowBuilder, WorkflowDefinition};
pub use registry::{validate, WorkflowRegistry};
