//! Custom node: an arbitrary async function, optionally schema-checked.

use crate::context::WorkflowContext;
use crate::error::NodeError;
use crate::node::WorkflowNode;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// The function a [`CustomNode`] runs.
pub type CustomFn =
    Arc<dyn Fn(Value, WorkflowContext) -> BoxFuture<'static, Result<Value, NodeError>> + Send + Sync>;

/// A node wrapping an arbitrary async function, for logic that doesn't
/// fit the LLM/tool/condition/parallel shapes — a side-effecting call, a
/// pure transform, glue between two other nodes' output shapes.
pub struct CustomNode {
    name: String,
    f: CustomFn,
    input_schema: Option<Value>,
    output_schema: Option<Value>,
}

fn validate_against(schema: &Value, value: &Value, what: &str) -> Result<(), NodeError> {
    let compiled = jsonschema::validator_for(schema)
        .map_err(|e| NodeError::new(format!("invalid {what} schema: {e}")))?;
    if let Err(first) = compiled.validate(value) {
        return Err(NodeError::new(format!("{what} failed schema validation: {first}")));
    }
    Ok(())
}

impl CustomNode {
    /// Construct a node named `name` that runs `f`, with no schema checks.
    pub fn new(name: impl Into<String>, f: CustomFn) -> Self {
        CustomNode {
            name: name.into(),
            f,
            input_schema: None,
            output_schema: None,
        }
    }

    /// Validates the node's input against `schema` before calling `f`.
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Validates `f`'s output against `schema` before returning it.
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }
}

#[async_trait]
impl WorkflowNode for CustomNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError> {
        if let Some(schema) = &self.input_schema {
            validate_against(schema, &input, "input")?;
        }
        let output = (self.f)(input, ctx.clone()).await?;
        if let Some(schema) = &self.output_schema {
            validate_against(schema, &output, "output")?;
        }
        Ok(output)
    }
}
