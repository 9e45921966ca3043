//! Execution order scheduling
//!
//! Topologically orders a dependency graph. Ties between simultaneously
//! ready instances break by authoring order, so identical definitions
//! always replay in the same order. The trigger is authored first and has
//! in-degree zero, so it always leads the schedule.

use std::collections::{HashMap, HashSet};

use super::graph::DependencyGraph;

/// Total order of instance ids consistent with every dependency edge.
///
/// The graph is acyclic by construction, so every instance appears exactly
/// once and the scan below always terminates.
pub fn schedule(graph: &DependencyGraph) -> Vec<String> {
    let mut in_degree: HashMap<&str, usize> = graph
        .instance_ids()
        .iter()
        .map(|id| (id.as_str(), 0))
        .collect();
    for producer in graph.instance_ids() {
        for consumer in graph.consumers(producer) {
            *in_degree.get_mut(consumer.as_str()).unwrap() += 1;
        }
    }

    let mut order = Vec::with_capacity(graph.len());
    let mut emitted: HashSet<&str> = HashSet::new();

    while order.len() < graph.len() {
        // Earliest-authored instance with all dependencies satisfied.
        let next = graph
            .instance_ids()
            .iter()
            .find(|id| !emitted.contains(id.as_str()) && in_degree[id.as_str()] == 0)
            .expect("acyclic graph always has a ready instance");

        emitted.insert(next.as_str());
        for consumer in graph.consumers(next) {
            *in_degree.get_mut(consumer.as_str()).unwrap() -= 1;
        }
        order.push(next.clone());
    }

    order
}
