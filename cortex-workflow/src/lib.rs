#![deny(missing_docs)]
//! Node/edge workflow graph execution.
//!
//! A [`graph::WorkflowGraph`] is built from [`node::WorkflowNode`]
//! trait objects and guarded edges, validated into a
//! [`graph::CompiledWorkflow`] by [`graph::WorkflowGraph::compile`], and
//! run breadth-wise wave by wave via [`executor::invoke`] or streamed
//! event-by-event via [`executor::execute_streaming`]. Unlike an
//! acyclic state graph, cycles are allowed by design — `max_iterations`
//! bounds a ReAct-style loop that closes back on itself instead of a
//! compile-time check rejecting it.
//!
//! [`nodes`] has the built-in node types (LLM, tool, condition,
//! parallel, custom); [`decorators`] wraps any node with retry, timeout,
//! fallback, a circuit breaker, or error handling, without changing its
//! interface.

pub mod context;
pub mod decorators;
pub mod error;
pub mod event;
pub mod executor;
pub mod graph;
pub mod node;
pub mod nodes;

pub use context::WorkflowContext;
pub use error::{CompilationError, NodeError, NodeExecutionError, WorkflowError};
pub use event::WorkflowEvent;
pub use executor::{execute_streaming, invoke, ExecuteOptions, WorkflowOutcome};
pub use graph::{always, CompiledWorkflow, GuardFn, WorkflowGraph};
pub use node::WorkflowNode;
