//! # Wireflow
//!
//! A workflow automation execution core: declarative workflows wire reusable
//! components together, sharing data through a per-run context with
//! `{{key}}` placeholder resolution.
//!
//! ## Features
//!
//! - **Declarative JSON workflows** - One trigger plus a set of actions
//! - **Dependency scheduling** - Actions order themselves by the outputs
//!   they reference; cycles and dangling references are rejected up front
//! - **Placeholder syntax** - Use `{{key}}` to consume upstream outputs,
//!   with per-instance output aliasing to disambiguate repeated types
//! - **Persistent listeners** - Event triggers run as supervised background
//!   tasks that execute the workflow once per qualifying event
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wireflow::{
//!     builtin_registry, schedule, ComponentInstance, DependencyGraph, Executor,
//!     WorkflowContext, WorkflowDefinition,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let def = WorkflowDefinition::new("shout")
//!         .with_instance(
//!             ComponentInstance::trigger("slack.receive_message")
//!                 .with_config("token", "xapp-...")
//!                 .with_config("keyword", "deploy"),
//!         )
//!         .with_instance(
//!             ComponentInstance::action("formatter.text")
//!                 .with_config("operation", "urlencode")
//!                 .with_config("input", "{{message_text}}"),
//!         );
//!
//!     let registry = Arc::new(builtin_registry());
//!     let graph = DependencyGraph::build(&def, &registry)?;
//!     let order = schedule(&graph);
//!
//!     let executor = Executor::new(registry);
//!     let context = WorkflowContext::new();
//!     let result = executor.run(&def, &order, &context).await;
//!
//!     println!("run {} success={}", result.run_id, result.success);
//!     Ok(())
//! }
//! ```

pub mod components;
pub mod engine;
pub mod registry;
pub mod workflow;

// Re-export main types
pub use components::builtin_registry;
pub use engine::{
    schedule, DependencyGraph, EngineError, EventSource, Executor, InboundEvent, InstanceStatus,
    ListenerHandle, ListenerState, ListenerSupervisor, RunFailure, RunResult, TriggerFilter,
};
pub use registry::{
    Component, ComponentRegistry, ComponentSpec, IntegrationError, InvocationKind, ParamKind,
    ParamSpec,
};
pub use workflow::{
    ComponentInstance, Role, StoreError, WorkflowContext, WorkflowDefinition, WorkflowStore,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::components::builtin_registry;
    pub use crate::engine::{
        schedule, DependencyGraph, EngineError, EventSource, Executor, InboundEvent,
        ListenerState, ListenerSupervisor, RunResult,
    };
    pub use crate::registry::{Component, ComponentRegistry, ComponentSpec, InvocationKind};
    pub use crate::workflow::{
        ComponentInstance, Role, WorkflowContext, WorkflowDefinition, WorkflowStore,
    };
}
