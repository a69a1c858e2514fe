//! Frozen per-wave context snapshot passed to nodes and guards.

use crate::event::WorkflowEvent;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Context extended with each finished node's output and the name of the
/// node about to run. Cloned once per node per wave (guards and parallel
/// nodes within a wave must not observe each other's in-flight writes),
/// same reasoning as loom's `Runtime` snapshot.
#[derive(Debug, Clone, Default)]
pub struct WorkflowContext {
    /// Every node's output so far, keyed by node name.
    pub node_outputs: HashMap<String, Value>,
    /// Per-node input overrides, keyed by `"<name>_input"`.
    pub overrides: HashMap<String, Value>,
    /// The node about to execute, set on the snapshot handed to it.
    pub current_node: Option<String>,
    /// Node names in completion order so far.
    pub execution_path: Vec<String>,
    /// Present only under [`crate::executor::execute_streaming`]; a node
    /// that streams its own output (currently just
    /// [`crate::nodes::llm::LlmNode`]) sends `LlmToken` events here as
    /// they arrive instead of only returning a finished value.
    pub token_sink: Option<mpsc::UnboundedSender<WorkflowEvent>>,
}

impl WorkflowContext {
    /// An empty context, as seen before the first wave runs.
    pub fn new() -> Self {
        WorkflowContext::default()
    }

    /// The override for `node_name`, if one was set via
    /// `<node_name>_input`.
    pub fn input_override(&self, node_name: &str) -> Option<&Value> {
        self.overrides.get(&format!("{node_name}_input"))
    }

    /// Set a per-node input override, consumed on that node's next run.
    pub fn set_input_override(&mut self, node_name: &str, value: Value) {
        self.overrides.insert(format!("{node_name}_input"), value);
    }

    pub(crate) fn snapshot_for(&self, node_name: &str) -> WorkflowContext {
        let mut snap = self.clone();
        snap.current_node = Some(node_name.to_string());
        snap
    }
}
