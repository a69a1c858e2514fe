//! Workflow compilation and execution errors.

use thiserror::Error;

/// Error building a [`crate::graph::CompiledWorkflow`] from a
/// [`crate::graph::WorkflowGraph`].
#[derive(Debug, Error)]
pub enum CompilationError {
    /// Two nodes were registered under the same name.
    #[error("duplicate node: {0}")]
    DuplicateNode(String),

    /// An edge referenced a node that was never added to the graph.
    #[error("edge references unknown node: {0}")]
    UnknownNode(String),

    /// An explicit `start_node` was given but never added to the graph.
    #[error("start node not found: {0}")]
    StartNodeNotFound(String),

    /// No `start_node` was given, and zero or more than one node has no
    /// incoming edge, so the unique entry point can't be inferred.
    #[error("could not determine start node: {0} candidates with no incoming edge")]
    CouldNotDetermineStart(usize),
}

/// Error from a single node's `execute`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct NodeError(pub String);

impl NodeError {
    /// Wrap any displayable error as a [`NodeError`].
    pub fn new(message: impl Into<String>) -> Self {
        NodeError(message.into())
    }
}

impl From<cortex_tool::ToolError> for NodeError {
    fn from(e: cortex_tool::ToolError) -> Self {
        NodeError(e.to_string())
    }
}

impl From<cortex_llm::ProviderError> for NodeError {
    fn from(e: cortex_llm::ProviderError) -> Self {
        NodeError(e.to_string())
    }
}

/// A node's execution failed, identifying which node and wrapping its cause.
/// Produced by decorators (`with_retry` on exhaustion, `with_timeout` on
/// expiry) and by the executor when a node's `execute` returns an error.
#[derive(Debug, Error)]
#[error("node {node_name} failed: {source}")]
pub struct NodeExecutionError {
    /// The failing node's name.
    pub node_name: String,
    /// The underlying error.
    #[source]
    pub source: NodeError,
}

impl NodeExecutionError {
    /// Build a new execution error for `node_name`.
    pub fn new(node_name: impl Into<String>, source: NodeError) -> Self {
        NodeExecutionError {
            node_name: node_name.into(),
            source,
        }
    }
}

/// Error from running a compiled workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A node raised an error during execution; the wave that produced it
    /// is abandoned and the run stops here.
    #[error(transparent)]
    NodeFailed(#[from] NodeExecutionError),

    /// The run's `abort` token fired.
    #[error("workflow aborted")]
    Aborted,

    /// The run exceeded its wall-clock `timeout`.
    #[error("workflow timed out")]
    TimedOut,

    /// More waves ran than `max_iterations` allows; guards against runaway
    /// cycles in a graph that permits them by design.
    #[error("exceeded max iterations ({0})")]
    MaxIterationsExceeded(usize),

    /// Graph compilation failed.
    #[error(transparent)]
    Compilation(#[from] CompilationError),
}
