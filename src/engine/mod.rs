//! Execution engine: graph construction, scheduling, execution, and the
//! persistent listener supervisor.

pub mod error;
pub mod executor;
pub mod graph;
pub mod listener;
pub mod result;
pub mod scheduler;

pub use error::EngineError;
pub use executor::Executor;
pub use graph::DependencyGraph;
pub use listener::{
    EventSource, InboundEvent, ListenerHandle, ListenerState, ListenerSupervisor, TriggerFilter,
};
pub use result::{InstanceStatus, RunFailure, RunResult};
pub use scheduler::schedule;
