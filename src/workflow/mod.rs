//! Workflow types and runtime state
//!
//! - `definition` - ComponentInstance, Role, and WorkflowDefinition
//! - `context` - WorkflowContext, the per-run shared namespace
//! - `placeholder` - `{{key}}` token scanning
//! - `store` - JSON persistence for named definitions

pub mod context;
pub mod definition;
pub mod placeholder;
pub mod store;

pub use context::WorkflowContext;
pub use definition::{ComponentInstance, Role, WorkflowDefinition};
pub use placeholder::{contains_placeholder, placeholder_keys};
pub use store::{StoreError, WorkflowStore};
