//! Extraction step DAG and topological ordering.

use crate::error::{CoreError, CoreResult};
use crate::literals::storage_literals;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A named node of the extraction workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Profiling,
    Classification,
    RelationshipDiscovery,
    Enrichment,
    TerminologyDiscovery,
    Finalization,
}

storage_literals!(StepKind, "step", {
    Profiling => "profiling",
    Classification => "classification",
    RelationshipDiscovery => "relationship_discovery",
    Enrichment => "enrichment",
    TerminologyDiscovery => "terminology_discovery",
    Finalization => "finalization",
});

impl StepKind {
    pub const ALL: [StepKind; 6] = [
        StepKind::Profiling,
        StepKind::Classification,
        StepKind::RelationshipDiscovery,
        StepKind::Enrichment,
        StepKind::TerminologyDiscovery,
        StepKind::Finalization,
    ];

    /// Steps this one consumes the output of.
    pub fn dependencies(self) -> &'static [StepKind] {
        match self {
            StepKind::Profiling => &[],
            StepKind::Classification => &[StepKind::Profiling],
            StepKind::RelationshipDiscovery => &[StepKind::Classification],
            StepKind::Enrichment => &[StepKind::Classification, StepKind::RelationshipDiscovery],
            StepKind::TerminologyDiscovery => &[StepKind::Enrichment],
            StepKind::Finalization => &[StepKind::Enrichment, StepKind::TerminologyDiscovery],
        }
    }

    /// Optional steps degrade instead of failing the run.
    pub fn is_optional(self) -> bool {
        matches!(self, StepKind::TerminologyDiscovery)
    }
}

/// A directed acyclic graph of step dependencies.
#[derive(Debug)]
pub struct StepDag {
    graph: DiGraph<StepKind, ()>,
    node_map: HashMap<StepKind, NodeIndex>,
}

impl StepDag {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// The fixed extraction workflow.
    pub fn extraction() -> CoreResult<Self> {
        Self::build(StepKind::ALL.iter().map(|s| (*s, s.dependencies().to_vec())))
    }

    pub fn add_step(&mut self, step: StepKind) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&step) {
            return idx;
        }
        let idx = self.graph.add_node(step);
        self.node_map.insert(step, idx);
        idx
    }

    /// Add a dependency edge (`step` depends on `on`).
    pub fn add_dependency(&mut self, step: StepKind, on: StepKind) {
        let step_idx = self.add_step(step);
        let on_idx = self.add_step(on);
        // Edge runs dependency -> dependent so toposort yields dependencies first.
        self.graph.add_edge(on_idx, step_idx, ());
    }

    pub fn build(deps: impl IntoIterator<Item = (StepKind, Vec<StepKind>)>) -> CoreResult<Self> {
        let mut dag = Self::new();
        for (step, on) in deps {
            dag.add_step(step);
            for dep in on {
                dag.add_dependency(step, dep);
            }
        }
        dag.validate()?;
        Ok(dag)
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.topological_order().map(|_| ())
    }

    /// Steps in dependency order. Ties break by declaration order of [`StepKind`].
    pub fn topological_order(&self) -> CoreResult<Vec<StepKind>> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(self.stable_order()),
            Err(cycle) => Err(CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Kahn's algorithm picking the smallest ready step each round.
    fn stable_order(&self) -> Vec<StepKind> {
        let mut indegree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                (
                    idx,
                    self.graph
                        .edges_directed(idx, petgraph::Direction::Incoming)
                        .count(),
                )
            })
            .collect();
        let mut order = Vec::with_capacity(indegree.len());
        while !indegree.is_empty() {
            let Some(next) = indegree
                .iter()
                .filter(|(_, d)| **d == 0)
                .map(|(idx, _)| *idx)
                .min_by_key(|idx| self.graph[*idx])
            else {
                break;
            };
            indegree.remove(&next);
            for edge in self.graph.edges(next) {
                if let Some(d) = indegree.get_mut(&edge.target()) {
                    *d = d.saturating_sub(1);
                }
            }
            order.push(self.graph[next]);
        }
        order
    }

    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut path = vec![self.graph[start].to_string()];
        let mut current = start;
        let mut visited = HashSet::from([start]);
        while let Some(edge) = self.graph.edges(current).next() {
            let target = edge.target();
            path.push(self.graph[target].to_string());
            if target == start || !visited.insert(target) {
                break;
            }
            current = target;
        }
        path.join(" -> ")
    }

    /// Direct dependencies of `step`.
    pub fn dependencies(&self, step: StepKind) -> Vec<StepKind> {
        let Some(&idx) = self.node_map.get(&step) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, petgraph::Direction::Incoming)
            .map(|e| self.graph[e.source()])
            .collect()
    }

    pub fn contains(&self, step: StepKind) -> bool {
        self.node_map.contains_key(&step)
    }
}

impl Default for StepDag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
