//! Lifecycle events emitted by [`crate::executor::execute_streaming`].

use serde::Serialize;
use serde_json::Value;

/// One lifecycle transition of a streaming workflow run.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// The run has begun.
    WorkflowStart {
        /// The resolved entry node.
        start_node: String,
    },
    /// A node has begun executing.
    NodeStart {
        /// The node's name.
        node_name: String,
    },
    /// A node finished successfully.
    NodeComplete {
        /// The node's name.
        node_name: String,
        /// The node's output.
        output: Value,
    },
    /// A node raised an error; the run stops after this event.
    NodeError {
        /// The node's name.
        node_name: String,
        /// The error message.
        message: String,
    },
    /// Incremental text from an LLM node, one per provider chunk.
    LlmToken {
        /// The emitting node's name.
        node_name: String,
        /// The text delta.
        delta: String,
        /// Index of this token within the node's response.
        token_index: usize,
    },
    /// The run finished without error.
    WorkflowComplete {
        /// The final output (the last-finished node's output).
        output: Value,
        /// Node names in completion order.
        execution_path: Vec<String>,
    },
    /// The run stopped due to an error (node failure, timeout, abort, or
    /// exceeding `max_iterations`).
    WorkflowError {
        /// The error message.
        message: String,
    },
}
