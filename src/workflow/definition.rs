//! Workflow definitions
//!
//! A workflow is an ordered list of configured component instances: exactly
//! one trigger authored first, followed by zero or more actions. Definitions
//! are serialized as JSON by the store and validated before graph building.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::engine::error::EngineError;

/// Position of an instance in a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The single event-producing instance that starts the run.
    Trigger,
    /// A side-effecting or transformational step.
    Action,
}

/// One configured step in a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInstance {
    /// Stable unique identifier within the workflow, generated at creation.
    #[serde(default = "generate_instance_id")]
    pub id: String,

    /// Reference into the component registry, e.g. `slack.send_message`.
    #[serde(rename = "type")]
    pub type_id: String,

    pub role: Role,

    /// Parameter name to literal value or `{{key}}` placeholder template.
    #[serde(default)]
    pub config: HashMap<String, String>,

    /// Default output key to user-chosen key, for conflict avoidance across
    /// instances of the same type.
    #[serde(default)]
    pub output_aliases: HashMap<String, String>,
}

fn generate_instance_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ComponentInstance {
    pub fn trigger(type_id: impl Into<String>) -> Self {
        Self::new(type_id, Role::Trigger)
    }

    pub fn action(type_id: impl Into<String>) -> Self {
        Self::new(type_id, Role::Action)
    }

    fn new(type_id: impl Into<String>, role: Role) -> Self {
        Self {
            id: generate_instance_id(),
            type_id: type_id.into(),
            role,
            config: HashMap::new(),
            output_aliases: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_alias(mut self, default_key: impl Into<String>, alias: impl Into<String>) -> Self {
        self.output_aliases.insert(default_key.into(), alias.into());
        self
    }

    /// The context key an output lands under: the user alias when one is
    /// configured, the component's default key otherwise.
    pub fn effective_output_key<'a>(&'a self, default_key: &'a str) -> &'a str {
        self.output_aliases
            .get(default_key)
            .map(String::as_str)
            .unwrap_or(default_key)
    }
}

/// A named, ordered set of component instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,

    #[serde(default)]
    pub instances: Vec<ComponentInstance>,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: Vec::new(),
        }
    }

    pub fn with_instance(mut self, instance: ComponentInstance) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn instance(&self, id: &str) -> Option<&ComponentInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    pub fn trigger(&self) -> Option<&ComponentInstance> {
        self.instances.iter().find(|i| i.role == Role::Trigger)
    }

    pub fn actions(&self) -> impl Iterator<Item = &ComponentInstance> {
        self.instances.iter().filter(|i| i.role == Role::Action)
    }

    /// Structural validation: at least one instance, unique ids, exactly one
    /// trigger, and the trigger authored before every action.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.instances.is_empty() {
            return Err(EngineError::InvalidDefinition(format!(
                "workflow '{}' has no instances",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for instance in &self.instances {
            if !seen.insert(instance.id.as_str()) {
                return Err(EngineError::InvalidDefinition(format!(
                    "duplicate instance id '{}'",
                    instance.id
                )));
            }
        }

        let trigger_count = self
            .instances
            .iter()
            .filter(|i| i.role == Role::Trigger)
            .count();
        if trigger_count != 1 {
            return Err(EngineError::InvalidDefinition(format!(
                "workflow '{}' has {} triggers, expected exactly one",
                self.name, trigger_count
            )));
        }

        if self.instances[0].role != Role::Trigger {
            return Err(EngineError::InvalidDefinition(format!(
                "workflow '{}' must author its trigger first",
                self.name
            )));
        }

        Ok(())
    }
}
