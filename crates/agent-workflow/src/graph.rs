//! Graph definition and execution
//!
//! A [`StateGraph`] maps keys to nodes. Every node has exactly one outgoing
//! edge: either a fixed successor or a router that inspects the state after
//! the node's update was applied. Execution is strictly sequential.
//!
//! ```
//! use agent_core::{Node, Result, State};
//! use agent_workflow::StateGraph;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Counter(u32);
//!
//! impl State for Counter {
//!     type Update = u32;
//!     fn apply(&mut self, update: u32) {
//!         self.0 += update;
//!     }
//! }
//!
//! struct Add;
//!
//! #[async_trait]
//! impl Node<Counter> for Add {
//!     async fn run(&self, _state: &Counter) -> Result<u32> {
//!         Ok(1)
//!     }
//!     fn name(&self) -> &str {
//!         "add"
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let graph = StateGraph::<Counter, &str>::builder("add", "end")
//!     .add_node("add", Arc::new(Add))
//!     .add_conditional_edge("add", |s: &Counter| if s.0 < 3 { "add" } else { "end" })
//!     .build()
//!     .unwrap();
//!
//! let run = graph.run(Counter::default()).await.unwrap();
//! assert_eq!(run.state.0, 3);
//! assert!(run.completed);
//! # }
//! ```

use crate::{Result, WorkflowError};
use agent_core::{Node, State};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const DEFAULT_MAX_STEPS: usize = 25;

type Router<S, K> = Arc<dyn Fn(&S) -> K + Send + Sync>;

enum Edge<S, K> {
    Fixed(K),
    Conditional(Router<S, K>),
}

/// Receives every update before it is applied
pub trait StepObserver<S: State, K>: Send + Sync {
    /// Called once per executed node
    fn on_step(&self, step: usize, key: K, update: &S::Update);
}

/// Observer that ignores every step
pub struct NoOpObserver;

impl<S: State, K> StepObserver<S, K> for NoOpObserver {
    fn on_step(&self, _step: usize, _key: K, _update: &S::Update) {}
}

/// Final state of a graph walk
#[derive(Debug)]
pub struct GraphRun<S, K> {
    /// State after the last applied update
    pub state: S,
    /// Keys of the executed nodes, in order
    pub path: Vec<K>,
    /// Whether the finish key was reached within the step limit
    pub completed: bool,
}

impl<S, K> GraphRun<S, K> {
    /// Number of executed nodes
    pub fn steps(&self) -> usize {
        self.path.len()
    }
}

/// A compiled state machine over `S` with node keys `K`
pub struct StateGraph<S: State, K> {
    nodes: HashMap<K, Arc<dyn Node<S>>>,
    edges: HashMap<K, Edge<S, K>>,
    entry: K,
    finish: K,
    max_steps: usize,
}

impl<S, K> StateGraph<S, K>
where
    S: State,
    K: Copy + Eq + Hash + Debug + Send + Sync,
{
    /// Start building a graph that begins at `entry` and stops at `finish`
    pub fn builder(entry: K, finish: K) -> StateGraphBuilder<S, K> {
        StateGraphBuilder::new(entry, finish)
    }

    /// Entry key
    pub fn entry(&self) -> K {
        self.entry
    }

    /// Step limit
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Key that follows `from` for the given state
    ///
    /// Returns `None` for keys without an outgoing edge (the finish key).
    pub fn next(&self, from: K, state: &S) -> Option<K> {
        self.edges.get(&from).map(|edge| match edge {
            Edge::Fixed(to) => *to,
            Edge::Conditional(router) => router(state),
        })
    }

    /// Walk the graph from the entry key
    pub async fn run(&self, state: S) -> Result<GraphRun<S, K>> {
        self.run_with_observer(state, &NoOpObserver).await
    }

    /// Walk the graph, reporting each update to `observer`
    ///
    /// Hitting the step limit is not an error; the returned run is marked
    /// incomplete.
    #[instrument(skip_all, fields(entry = ?self.entry, max_steps = self.max_steps))]
    pub async fn run_with_observer(
        &self,
        mut state: S,
        observer: &dyn StepObserver<S, K>,
    ) -> Result<GraphRun<S, K>> {
        let mut current = self.entry;
        let mut path = Vec::new();

        while current != self.finish {
            if path.len() >= self.max_steps {
                warn!(steps = path.len(), at = ?current, "Step limit reached, stopping");
                return Ok(GraphRun {
                    state,
                    path,
                    completed: false,
                });
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| WorkflowError::UnknownNode(format!("{current:?}")))?;

            info!(step = path.len() + 1, node = ?current, "Running node");
            let update = node
                .run(&state)
                .await
                .map_err(|source| WorkflowError::NodeFailed {
                    node: node.name().to_string(),
                    source,
                })?;

            observer.on_step(path.len() + 1, current, &update);
            state.apply(update);
            path.push(current);

            let next = self
                .next(current, &state)
                .ok_or_else(|| WorkflowError::InvalidGraph(format!("{current:?} has no edge")))?;
            debug!(from = ?current, to = ?next, "Transition");
            current = next;
        }

        Ok(GraphRun {
            state,
            path,
            completed: true,
        })
    }
}

impl<S: State, K: Debug> Debug for StateGraph<S, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateGraph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("entry", &self.entry)
            .field("finish", &self.finish)
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing graphs
pub struct StateGraphBuilder<S: State, K> {
    nodes: Vec<(K, Arc<dyn Node<S>>)>,
    edges: Vec<(K, Edge<S, K>)>,
    entry: K,
    finish: K,
    max_steps: usize,
}

impl<S, K> StateGraphBuilder<S, K>
where
    S: State,
    K: Copy + Eq + Hash + Debug + Send + Sync,
{
    /// Create a new builder
    pub fn new(entry: K, finish: K) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            entry,
            finish,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Register a node under `key`
    pub fn add_node(mut self, key: K, node: Arc<dyn Node<S>>) -> Self {
        self.nodes.push((key, node));
        self
    }

    /// Always continue from `from` to `to`
    pub fn add_edge(mut self, from: K, to: K) -> Self {
        self.edges.push((from, Edge::Fixed(to)));
        self
    }

    /// Continue from `from` to whatever `router` picks for the updated state
    pub fn add_conditional_edge<F>(mut self, from: K, router: F) -> Self
    where
        F: Fn(&S) -> K + Send + Sync + 'static,
    {
        self.edges.push((from, Edge::Conditional(Arc::new(router))));
        self
    }

    /// Set the maximum number of node executions per run
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Validate and build the graph
    ///
    /// Every node needs exactly one outgoing edge, fixed edges must target a
    /// node or the finish key, and the finish key itself cannot be a node.
    pub fn build(self) -> Result<StateGraph<S, K>> {
        if self.max_steps == 0 {
            return Err(WorkflowError::InvalidGraph(
                "max_steps must be at least 1".to_string(),
            ));
        }

        let mut nodes = HashMap::new();
        for (key, node) in self.nodes {
            if key == self.finish {
                return Err(WorkflowError::InvalidGraph(format!(
                    "finish key {key:?} cannot hold a node"
                )));
            }
            if nodes.insert(key, node).is_some() {
                return Err(WorkflowError::InvalidGraph(format!(
                    "duplicate node {key:?}"
                )));
            }
        }

        if !nodes.contains_key(&self.entry) {
            return Err(WorkflowError::UnknownNode(format!("{:?}", self.entry)));
        }

        let mut edges = HashMap::new();
        for (from, edge) in self.edges {
            if !nodes.contains_key(&from) {
                return Err(WorkflowError::UnknownNode(format!("{from:?}")));
            }
            if let Edge::Fixed(to) = &edge {
                if *to != self.finish && !nodes.contains_key(to) {
                    return Err(WorkflowError::UnknownNode(format!("{to:?}")));
                }
            }
            if edges.insert(from, edge).is_some() {
                return Err(WorkflowError::InvalidGraph(format!(
                    "{from:?} has more than one outgoing edge"
                )));
            }
        }

        if let Some(key) = nodes.keys().find(|key| !edges.contains_key(*key)) {
            return Err(WorkflowError::InvalidGraph(format!(
                "{key:?} has no outgoing edge"
            )));
        }

        Ok(StateGraph {
            nodes,
            edges,
            entry: self.entry,
            finish: self.finish,
            max_steps: self.max_steps,
        })
    }
}
