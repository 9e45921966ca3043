//! Execution result types

use std::collections::HashMap;

/// Outcome of one instance within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Succeeded,
    Failed,
    NotRun,
}

/// The first failure of a run, carrying the offending instance and cause.
#[derive(Debug, Clone)]
pub struct RunFailure {
    pub instance_id: String,
    pub error: String,
}

/// Summary of a workflow run: per-instance status, the first failure if any,
/// and the final context snapshot.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: String,
    pub success: bool,
    pub statuses: HashMap<String, InstanceStatus>,
    pub failure: Option<RunFailure>,
    pub outputs: HashMap<String, String>,
}

impl RunResult {
    pub fn status(&self, instance_id: &str) -> InstanceStatus {
        self.statuses
            .get(instance_id)
            .copied()
            .unwrap_or(InstanceStatus::NotRun)
    }
}
