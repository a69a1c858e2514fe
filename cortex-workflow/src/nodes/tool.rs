//! Tool node: optional input projection, tool execution, optional result transform.

use crate::context::WorkflowContext;
use crate::error::NodeError;
use crate::node::WorkflowNode;
use async_trait::async_trait;
use cortex_tool::ToolDyn;
use serde_json::Value;
use std::sync::Arc;

/// Projects a node's input into a tool's input shape.
pub type ProjectFn = Arc<dyn Fn(&Value, &WorkflowContext) -> Value + Send + Sync>;

/// Transforms a tool's output into the node's output.
pub type TransformFn = Arc<dyn Fn(&cortex_tool::ToolOutput) -> Value + Send + Sync>;

/// A workflow node that executes a registered tool.
///
/// A tool failure (`ToolOutput::success == false`) is surfaced as the
/// node's output by default — same as the ReAct loop turning a failed
/// tool call into a tool-role message rather than terminating the run —
/// unless `fail_on_tool_error` is set, in which case it becomes a
/// [`NodeError`].
pub struct ToolNode {
    name: String,
    tool: Arc<dyn ToolDyn>,
    project: Option<ProjectFn>,
    transform: Option<TransformFn>,
    fail_on_tool_error: bool,
}

impl ToolNode {
    /// Construct a node named `name` that calls `tool` directly with the
    /// node's input, unless a projection is set via
    /// [`ToolNode::with_projection`].
    pub fn new(name: impl Into<String>, tool: Arc<dyn ToolDyn>) -> Self {
        ToolNode {
            name: name.into(),
            tool,
            project: None,
            transform: None,
            fail_on_tool_error: false,
        }
    }

    /// Maps the node's input into the tool's input shape before calling it.
    pub fn with_projection(mut self, project: ProjectFn) -> Self {
        self.project = Some(project);
        self
    }

    /// Maps the tool's output into the node's output.
    pub fn with_transform(mut self, transform: TransformFn) -> Self {
        self.transform = Some(transform);
        self
    }

    /// When set, a tool-level failure becomes a [`NodeError`] instead of
    /// a node output carrying `{success: false, error: ...}`.
    pub fn fail_on_tool_error(mut self) -> Self {
        self.fail_on_tool_error = true;
        self
    }
}

#[async_trait]
impl WorkflowNode for ToolNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError> {
        let tool_input = match &self.project {
            Some(project) => project(&input, ctx),
            None => input,
        };

        self.tool
            .validate(&tool_input)
            .map_err(|e| NodeError::new(e.to_string()))?;
        let output = self.tool.call(tool_input).await;

        if self.fail_on_tool_error && !output.success {
            return Err(NodeError::new(
                output.error.unwrap_or_else(|| "tool failed".into()),
            ));
        }

        match &self.transform {
            Some(transform) => Ok(transform(&output)),
            None => Ok(serde_json::to_value(&output).map_err(|e| NodeError::new(e.to_string()))?),
        }
    }
}
