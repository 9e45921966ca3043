//! Dependency graph builder
//!
//! Builds a directed acyclic graph over the instances of one workflow. An
//! edge A -> B means B's configuration references an output key A declares
//! (after applying B's referenced key to A's output aliases). Unmatched
//! references and cycles fail the build; nothing executes past this point.

use std::collections::{HashMap, HashSet};

use crate::engine::error::EngineError;
use crate::registry::ComponentRegistry;
use crate::workflow::{placeholder_keys, Role, WorkflowDefinition};

/// Directed acyclic graph over component instance ids.
///
/// Construction goes through [`DependencyGraph::build`], which rejects
/// cycles, so an existing graph is always acyclic.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Instance ids in authoring order.
    order: Vec<String>,
    /// Producer id -> consumer ids, deduplicated, in authoring order.
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph for a definition, using the registry's declared
    /// output schemas to match `{{key}}` references to producers.
    pub fn build(
        def: &WorkflowDefinition,
        registry: &ComponentRegistry,
    ) -> Result<Self, EngineError> {
        def.validate()?;

        // Effective output key -> producing instance ids, in authoring
        // order. Several instances may declare the same unaliased key; a
        // reference then depends on every one of them, since each write
        // lands under that key at run time.
        let mut producers: HashMap<String, Vec<String>> = HashMap::new();
        for instance in &def.instances {
            let spec = registry
                .spec(&instance.type_id)
                .ok_or_else(|| EngineError::UnknownComponentType(instance.type_id.clone()))?;
            for output in &spec.outputs {
                producers
                    .entry(instance.effective_output_key(output).to_string())
                    .or_default()
                    .push(instance.id.clone());
            }
        }

        let order: Vec<String> = def.instances.iter().map(|i| i.id.clone()).collect();
        let mut edges: HashMap<String, Vec<String>> = HashMap::new();

        for instance in &def.instances {
            let mut config_values: Vec<&String> = instance.config.values().collect();
            config_values.sort();

            for value in config_values {
                for key in placeholder_keys(value) {
                    // A self-reference has no valid producer.
                    let matching: Vec<&String> = producers
                        .get(&key)
                        .map(|ids| ids.iter().filter(|id| **id != instance.id).collect())
                        .unwrap_or_default();

                    if matching.is_empty() {
                        return Err(EngineError::UnresolvedReference {
                            key,
                            instance_id: instance.id.clone(),
                        });
                    }

                    // The trigger starts every run with nothing upstream of
                    // it; it can never consume another instance's output.
                    if instance.role == Role::Trigger {
                        return Err(EngineError::InvalidDefinition(format!(
                            "trigger '{}' references '{}', an output of '{}'",
                            instance.id, key, matching[0]
                        )));
                    }

                    for producer in matching {
                        let consumers = edges.entry(producer.clone()).or_default();
                        if !consumers.contains(&instance.id) {
                            consumers.push(instance.id.clone());
                        }
                    }
                }
            }
        }

        let graph = Self { order, edges };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Depth-first cycle detection tracking the recursion stack; reports the
    /// offending cycle path.
    fn check_acyclic(&self) -> Result<(), EngineError> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();
        let mut on_stack: HashSet<&str> = HashSet::new();

        for start in &self.order {
            if !visited.contains(start.as_str()) {
                self.visit(start, &mut visited, &mut stack, &mut on_stack)?;
            }
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
        on_stack: &mut HashSet<&'a str>,
    ) -> Result<(), EngineError> {
        visited.insert(node);
        stack.push(node);
        on_stack.insert(node);

        for consumer in self.consumers(node) {
            if on_stack.contains(consumer.as_str()) {
                let from = stack.iter().position(|n| *n == consumer).unwrap_or(0);
                let mut cycle: Vec<String> =
                    stack[from..].iter().map(|n| n.to_string()).collect();
                cycle.push(consumer.clone());
                return Err(EngineError::CyclicDependency(cycle));
            }
            if !visited.contains(consumer.as_str()) {
                self.visit(consumer, visited, stack, on_stack)?;
            }
        }

        stack.pop();
        on_stack.remove(node);
        Ok(())
    }

    /// Instance ids in authoring order.
    pub fn instance_ids(&self) -> &[String] {
        &self.order
    }

    /// Instances whose configuration depends on `id`'s outputs.
    pub fn consumers(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
