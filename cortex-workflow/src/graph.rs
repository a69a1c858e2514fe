//! Workflow graph: nodes plus guarded edges, validated at compile time.
//!
//! Unlike a `StateGraph`, cycles are allowed by design — a ReAct-style
//! loop closes back on itself via a guarded edge, and `max_iterations`
//! (set on [`crate::executor::ExecuteOptions`]) is what bounds a runaway
//! cycle instead of a compile-time acyclicity check.

use crate::context::WorkflowContext;
use crate::error::CompilationError;
use crate::node::WorkflowNode;
use futures_util::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// An edge guard: called with the context snapshot after the source node
/// finishes; the edge fires only if this returns `true`. A guard
/// returning `false` simply removes the edge for this wave — not an
/// error.
pub type GuardFn = Arc<dyn Fn(WorkflowContext) -> BoxFuture<'static, bool> + Send + Sync>;

/// Build a guard that always fires, used for unconditional edges.
pub fn always() -> GuardFn {
    Arc::new(|_ctx| Box::pin(async { true }))
}

#[derive(Clone)]
struct Edge {
    to: String,
    guard: GuardFn,
}

/// Builder for a workflow graph. Mutating methods take `&mut self` and
/// return `&mut Self` for chaining, same fluent shape as the teacher's
/// graph builder.
#[derive(Default)]
pub struct WorkflowGraph {
    nodes: Vec<Arc<dyn WorkflowNode>>,
    edges: Vec<(String, Edge)>,
    start_node: Option<String>,
    max_iterations: usize,
}

impl WorkflowGraph {
    /// An empty graph. `max_iterations` defaults to 1000.
    pub fn new() -> Self {
        WorkflowGraph {
            nodes: Vec::new(),
            edges: Vec::new(),
            start_node: None,
            max_iterations: 1000,
        }
    }

    /// Registers a node under its own `name()`.
    pub fn add_node(&mut self, node: Arc<dyn WorkflowNode>) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// Adds an unconditional edge from `from` to `to`.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.add_guarded_edge(from, to, always())
    }

    /// Adds a guarded edge: fires only when `guard` resolves to `true`
    /// against the post-node context.
    pub fn add_guarded_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        guard: GuardFn,
    ) -> &mut Self {
        self.edges.push((
            from.into(),
            Edge {
                to: to.into(),
                guard,
            },
        ));
        self
    }

    /// Overrides automatic start-node inference.
    pub fn with_start_node(&mut self, name: impl Into<String>) -> &mut Self {
        self.start_node = Some(name.into());
        self
    }

    /// Caps the number of wavefront iterations a run may take, guarding
    /// against a cycle that never satisfies its exit guard.
    pub fn with_max_iterations(&mut self, max_iterations: usize) -> &mut Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Validates the graph and produces an executable [`CompiledWorkflow`].
    ///
    /// Checks, in order: duplicate node names, edges referencing unknown
    /// nodes, an explicit start node that doesn't exist, and — absent an
    /// explicit start node — that exactly one node has no incoming edge.
    pub fn compile(self) -> Result<CompiledWorkflow, CompilationError> {
        let mut node_map: HashMap<String, Arc<dyn WorkflowNode>> = HashMap::new();
        for node in &self.nodes {
            let name = node.name().to_string();
            if node_map.insert(name.clone(), node.clone()).is_some() {
                return Err(CompilationError::DuplicateNode(name));
            }
        }

        for (from, edge) in &self.edges {
            if !node_map.contains_key(from) {
                return Err(CompilationError::UnknownNode(from.clone()));
            }
            if !node_map.contains_key(&edge.to) {
                return Err(CompilationError::UnknownNode(edge.to.clone()));
            }
        }

        let start_node = match &self.start_node {
            Some(name) => {
                if !node_map.contains_key(name) {
                    return Err(CompilationError::StartNodeNotFound(name.clone()));
                }
                name.clone()
            }
            None => {
                let has_incoming: HashSet<&str> =
                    self.edges.iter().map(|(_, e)| e.to.as_str()).collect();
                let candidates: Vec<&String> = node_map
                    .keys()
                    .filter(|name| !has_incoming.contains(name.as_str()))
                    .collect();
                if candidates.len() != 1 {
                    return Err(CompilationError::CouldNotDetermineStart(candidates.len()));
                }
                candidates[0].clone()
            }
        };

        let mut adjacency: HashMap<String, Vec<Edge>> = HashMap::new();
        for (from, edge) in self.edges {
            adjacency.entry(from).or_default().push(edge);
        }

        Ok(CompiledWorkflow {
            nodes: node_map,
            adjacency,
            start_node,
            max_iterations: self.max_iterations,
        })
    }
}

/// An immutable, executable workflow graph produced by
/// [`WorkflowGraph::compile`].
pub struct CompiledWorkflow {
    pub(crate) nodes: HashMap<String, Arc<dyn WorkflowNode>>,
    adjacency: HashMap<String, Vec<Edge>>,
    pub(crate) start_node: String,
    pub(crate) max_iterations: usize,
}

impl CompiledWorkflow {
    /// The inferred or explicit entry node's name.
    pub fn start_node(&self) -> &str {
        &self.start_node
    }

    pub(crate) async fn successors(&self, finished: &str, ctx: &WorkflowContext) -> Vec<String> {
        let Some(edges) = self.adjacency.get(finished) else {
            return Vec::new();
        };
        let mut next = Vec::new();
        for edge in edges {
            if (edge.guard)(ctx.clone()).await {
                next.push(edge.to.clone());
            }
        }
        next
    }
}
