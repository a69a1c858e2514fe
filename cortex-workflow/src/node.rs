//! The workflow node contract.

use crate::context::WorkflowContext;
use crate::error::NodeError;
use async_trait::async_trait;
use serde_json::Value;

/// One executable step in a [`crate::graph::WorkflowGraph`].
///
/// Input and output are JSON values rather than a fixed associated type:
/// a graph mixes LLM, tool, condition, and parallel-fan-out nodes whose
/// shapes differ node to node, the same way a tool's input/output schema
/// is JSON rather than a Rust type in `cortex-tool`.
#[async_trait]
pub trait WorkflowNode: Send + Sync {
    /// Unique name within the graph; used as the edge/guard/output key.
    fn name(&self) -> &str;

    /// Run this node against `input` and the frozen context snapshot.
    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError>;
}
