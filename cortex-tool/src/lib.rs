#![deny(missing_docs)]
//! Tool interface and registry for cortex.
//!
//! Defines the [`ToolDyn`] trait for object-safe tool abstraction and
//! [`ToolRegistry`] for managing collections of tools. Any tool source
//! (local function, MCP server, HTTP endpoint) implements [`ToolDyn`].
//! Both the workflow executor's tool nodes and the ReAct agent loop
//! execute tools through this registry.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from tool operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found in the registry.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The input provided to the tool was invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Outcome of a single tool call.
///
/// Tools never throw across the boundary — a failure is a successful
/// `call()` that resolves to a `ToolOutput` with `success: false`. The
/// ReAct loop turns `success: false` into a tool-role message whose
/// content is `Error: <error>`, not a loop-terminating error, so the
/// model gets a chance to recover.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the tool call succeeded.
    pub success: bool,
    /// The result payload, present when `success` is true.
    pub data: Option<serde_json::Value>,
    /// The error message, present when `success` is false.
    pub error: Option<String>,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: u64,
}

impl ToolOutput {
    /// Build a successful output, timing from `started`.
    pub fn ok(data: serde_json::Value, started: Instant) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Build a failed output, timing from `started`.
    pub fn failed(error: impl Into<String>, started: Instant) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Object-safe trait for tool implementations.
///
/// Any tool source (local function, MCP server, HTTP endpoint) implements
/// this trait. Tools are stored as `Arc<dyn ToolDyn>` in [`ToolRegistry`].
/// Tools do not receive workflow/operator context — their inputs must be
/// fully specified by the caller (the executor or the ReAct loop), matching
/// the external tool plug-in contract.
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name within a registry.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// JSON Schema for the tool's output, when the tool author provides one.
    fn output_schema(&self) -> Option<serde_json::Value> {
        None
    }

    /// Whether invoking this tool requires explicit human approval before
    /// `call` is ever reached. The registry does not enforce this itself —
    /// it is read by the caller (ReAct loop / workflow tool node) which
    /// emits an `approval-requested` stream chunk and waits.
    fn needs_approval(&self) -> bool {
        false
    }

    /// Validate input against `input_schema` before executing. The default
    /// implementation accepts anything; schema-aware tools override this.
    fn validate(&self, _input: &serde_json::Value) -> Result<(), ToolError> {
        Ok(())
    }

    /// Execute the tool with the given input, producing a [`ToolOutput`]
    /// rather than propagating a Rust error for ordinary tool failures.
    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = ToolOutput> + Send + '_>>;
}

/// Registry of tools available to an agent or workflow.
///
/// Holds tools as `Arc<dyn ToolDyn>` keyed by name. The ReAct loop and
/// workflow tool nodes use this to look up and execute tools requested
/// by the model.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolDyn>> {
        self.tools.get(name)
    }

    /// Iterate over all registered tools.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ToolDyn>> {
        self.tools.values()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a named tool, returning `ToolError::NotFound` when absent,
    /// and validating input against the tool's schema first.
    pub async fn call(&self, name: &str, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.validate(&input)?;
        Ok(tool.call(input).await)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn tool_dyn_is_object_safe() {
        _assert_send_sync::<Arc<dyn ToolDyn>>();
    }

    #[test]
    fn tool_error_display() {
        assert_eq!(
            ToolError::NotFound("bash".into()).to_string(),
            "tool not found: bash"
        );
        assert_eq!(
            ToolError::ExecutionFailed("timeout".into()).to_string(),
            "execution failed: timeout"
        );
        assert_eq!(
            ToolError::InvalidInput("missing field".into()).to_string(),
            "invalid input: missing field"
        );
    }

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input back"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            input: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = ToolOutput> + Send + '_>> {
            Box::pin(async move {
                let started = Instant::now();
                ToolOutput::ok(json!({"echoed": input}), started)
            })
        }
    }

    struct FailTool;

    impl ToolDyn for FailTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            _input: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = ToolOutput> + Send + '_>> {
            Box::pin(async move {
                let started = Instant::now();
                ToolOutput::failed("always fails", started)
            })
        }
    }

    struct NeedsApprovalTool;

    impl ToolDyn for NeedsApprovalTool {
        fn name(&self) -> &str {
            "delete_all"
        }
        fn description(&self) -> &str {
            "Destructive operation requiring approval"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn needs_approval(&self) -> bool {
            true
        }
        fn call(
            &self,
            _input: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = ToolOutput> + Send + '_>> {
            Box::pin(async move { ToolOutput::ok(json!({"deleted": true}), Instant::now()) })
        }
    }

    #[test]
    fn registry_add_and_get() {
        let mut reg = ToolRegistry::new();
        assert!(reg.is_empty());

        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
        assert!(reg.get("echo").is_some());
        assert!(reg.get("nonexistent").is_none());
    }

    #[test]
    fn registry_iter() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(FailTool));

        let names: Vec<&str> = reg.iter().map(|t| t.name()).collect();
        assert!(names.contains(&"echo"));
        assert!(names.contains(&"fail"));
    }

    #[tokio::test]
    async fn registry_call_tool() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));

        let result = reg.call("echo", json!({"msg": "hello"})).await.unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap(), json!({"echoed": {"msg": "hello"}}));
    }

    #[tokio::test]
    async fn registry_call_failing_tool_is_not_a_rust_error() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));

        let result = reg.call("fail", json!({})).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("always fails"));
    }

    #[tokio::test]
    async fn registry_call_missing_tool_is_not_found() {
        let reg = ToolRegistry::new();
        let err = reg.call("nonexistent", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn registry_overwrite() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);

        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn needs_approval_flag_is_readable_without_executing() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(NeedsApprovalTool));
        let tool = reg.get("delete_all").unwrap();
        assert!(tool.needs_approval());
    }
}
