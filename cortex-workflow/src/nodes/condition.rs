//! Condition node: evaluates a predicate, returns a sentinel for routing.

use crate::context::WorkflowContext;
use crate::error::NodeError;
use crate::node::WorkflowNode;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A predicate over a node's input and the frozen context.
pub type PredicateFn = Arc<dyn Fn(&Value, &WorkflowContext) -> bool + Send + Sync>;

/// A node whose only job is to route: it evaluates `predicate` and
/// returns a `{"condition": true|false}` sentinel that a guarded edge
/// reads out of `ctx.node_outputs[name]` to pick the next node.
pub struct ConditionNode {
    name: String,
    predicate: PredicateFn,
}

impl ConditionNode {
    /// Construct a node named `name` evaluating `predicate`.
    pub fn new(name: impl Into<String>, predicate: PredicateFn) -> Self {
        ConditionNode {
            name: name.into(),
            predicate,
        }
    }
}

#[async_trait]
impl WorkflowNode for ConditionNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError> {
        let result = (self.predicate)(&input, ctx);
        Ok(serde_json::json!({ "condition": result }))
    }
}

/// A guard that reads a [`ConditionNode`] named `node_name`'s sentinel
/// and fires only when it is `true`.
pub fn when_true(node_name: impl Into<String>) -> crate::graph::GuardFn {
    let node_name = node_name.into();
    Arc::new(move |ctx: WorkflowContext| {
        let node_name = node_name.clone();
        Box::pin(async move {
            ctx.node_outputs
                .get(&node_name)
                .and_then(|v| v.get("condition"))
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
        })
    })
}

/// The negation of [`when_true`].
pub fn when_false(node_name: impl Into<String>) -> crate::graph::GuardFn {
    let node_name = node_name.into();
    Arc::new(move |ctx: WorkflowContext| {
        let node_name = node_name.clone();
        Box::pin(async move {
            !ctx.node_outputs
                .get(&node_name)
                .and_then(|v| v.get("condition"))
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
        })
    })
}
