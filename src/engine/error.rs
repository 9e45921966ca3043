//! Engine error types

pub use crate::registry::IntegrationError;

/// Errors raised while building, scheduling, or executing a workflow.
///
/// Graph-build errors (`UnresolvedReference`, `CyclicDependency`,
/// `InvalidDefinition`, `UnknownComponentType`) occur before any side effect
/// and are surfaced to the author. Execution errors are fatal to the run and
/// reported through the partial `RunResult`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid config for '{type_id}': {reason}")]
    InvalidConfig { type_id: String, reason: String },

    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),

    #[error("Invalid workflow definition: {0}")]
    InvalidDefinition(String),

    #[error("Unresolved reference '{key}' in instance '{instance_id}': no other instance declares this output")]
    UnresolvedReference { key: String, instance_id: String },

    #[error("Cyclic dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("Unresolved placeholder: {0}")]
    UnresolvedPlaceholder(String),

    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),
}
