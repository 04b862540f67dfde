//! Explicit DAG scheduler for the audit pipeline.
//!
//! The topology is a plain data structure (named nodes plus directed edges)
//! validated at build time: no cycles, no dangling edges, everything
//! reachable. Execution proceeds in supersteps: every node whose
//! predecessors have all completed runs concurrently against a snapshot of
//! the current merged state, and the wave's partial updates are folded back
//! in via the declared reducers. A fan-in node therefore observes all of its
//! upstream branches, including branches that failed and contributed an
//! empty update.

pub mod audit;

use crate::errors::GraphError;
use crate::state::{AgentState, StateUpdate};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Reserved entry point name.
pub const START: &str = "start";
/// Reserved terminal name.
pub const END: &str = "end";

/// One stage of the pipeline.
///
/// A node receives the current merged state (read-only snapshot) and returns
/// a sparse update. Returning `Err` is contained by the scheduler: the run
/// continues and the node contributes nothing.
#[async_trait]
pub trait Node: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn run(&self, state: &AgentState) -> anyhow::Result<StateUpdate>;
}

/// Builder for a [`Graph`]. Defects are reported by [`GraphBuilder::build`],
/// not at insertion time, so wiring code stays linear.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<Arc<dyn Node>>,
    edges: Vec<(String, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(mut self, node: Arc<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Validate the topology and produce an executable graph.
    pub fn build(self) -> Result<Graph, GraphError> {
        let mut nodes: BTreeMap<String, Arc<dyn Node>> = BTreeMap::new();
        for node in self.nodes {
            let name = node.name().to_string();
            if name == START || name == END {
                return Err(GraphError::ReservedNode(name));
            }
            if nodes.insert(name.clone(), node).is_some() {
                return Err(GraphError::DuplicateNode(name));
            }
        }

        let mut edges: BTreeSet<(String, String)> = BTreeSet::new();
        for (from, to) in self.edges {
            if from == END || to == START {
                return Err(GraphError::InvalidEndpoint { from, to });
            }
            let from_known = from == START || nodes.contains_key(&from);
            let to_known = to == END || nodes.contains_key(&to);
            if !from_known || !to_known {
                return Err(GraphError::UnknownEdgeEndpoint { from, to });
            }
            edges.insert((from, to));
        }

        let graph = Graph { nodes, edges };
        graph.validate()?;
        Ok(graph)
    }
}

/// An executable, inspectable DAG over [`AgentState`].
pub struct Graph {
    nodes: BTreeMap<String, Arc<dyn Node>>,
    edges: BTreeSet<(String, String)>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .finish()
    }
}

impl Graph {
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(f, t)| (f.as_str(), t.as_str()))
    }

    /// Declared predecessors of a node (the fan-in set the barrier waits on).
    pub fn predecessors(&self, name: &str) -> BTreeSet<String> {
        self.edges
            .iter()
            .filter(|(_, to)| to == name)
            .map(|(from, _)| from.clone())
            .collect()
    }

    fn successors(&self, name: &str) -> impl Iterator<Item = &str> {
        let name = name.to_string();
        self.edges
            .iter()
            .filter(move |(from, _)| from == &name)
            .map(|(_, to)| to.as_str())
    }

    fn validate(&self) -> Result<(), GraphError> {
        // Reachability from START.
        let mut reached: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([START.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !reached.insert(current.clone()) {
                continue;
            }
            for next in self.successors(&current) {
                queue.push_back(next.to_string());
            }
        }
        for name in self.nodes.keys() {
            if !reached.contains(name) {
                return Err(GraphError::Unreachable(name.clone()));
            }
        }
        if !self.nodes.is_empty() && !reached.contains(END) {
            return Err(GraphError::EndUnreachable);
        }

        // Cycle detection: Kahn over the real nodes; leftovers form a cycle.
        let mut indegree: BTreeMap<&str, usize> = self
            .nodes
            .keys()
            .map(|n| (n.as_str(), 0))
            .collect();
        for (from, to) in &self.edges {
            if from != START && to != END {
                *indegree.get_mut(to.as_str()).expect("validated endpoint") += 1;
            }
        }
        let mut ready: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();
        let mut processed = 0usize;
        while let Some(current) = ready.pop_front() {
            processed += 1;
            for next in self.successors(current) {
                if next == END {
                    continue;
                }
                let d = indegree.get_mut(next).expect("validated endpoint");
                *d -= 1;
                if *d == 0 {
                    ready.push_back(next);
                }
            }
        }
        if processed < self.nodes.len() {
            let stuck: Vec<String> = indegree
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(n, _)| (*n).to_string())
                .collect();
            return Err(GraphError::Cycle(stuck));
        }
        Ok(())
    }

    /// Run the graph to completion and return the final state.
    ///
    /// The returned state is the last merged snapshot; after this call it is
    /// no longer touched by any branch.
    pub async fn invoke(&self, initial: AgentState) -> AgentState {
        let mut state = initial;
        let mut completed: BTreeSet<String> = BTreeSet::from([START.to_string()]);
        let mut pending: BTreeSet<String> = self.nodes.keys().cloned().collect();

        while !pending.is_empty() {
            let wave: Vec<String> = pending
                .iter()
                .filter(|name| self.predecessors(name).is_subset(&completed))
                .cloned()
                .collect();
            if wave.is_empty() {
                // Unreachable after build-time validation.
                tracing::error!("scheduler stalled with pending nodes: {:?}", pending);
                break;
            }

            tracing::debug!(wave = ?wave, "running superstep");
            let mut join_set = JoinSet::new();
            for name in &wave {
                let node = Arc::clone(&self.nodes[name]);
                let snapshot = state.clone();
                join_set.spawn(async move {
                    let name = node.name().to_string();
                    let result = node.run(&snapshot).await;
                    (name, result)
                });
            }

            // Fold updates in completion order. Legal because the reducers
            // for shared fields are commutative and associative.
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((name, Ok(update))) => {
                        tracing::debug!(node = %name, empty = update.is_empty(), "merged update");
                        state.apply(update);
                    }
                    Ok((name, Err(err))) => {
                        tracing::warn!(node = %name, error = %err, "node failed; contributing empty update");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "node task aborted; contributing empty update");
                    }
                }
            }

            for name in wave {
                pending.remove(&name);
                completed.insert(name);
            }
        }

        state
    }
}
