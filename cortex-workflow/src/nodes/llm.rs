//! LLM node: builds a request from input/context, invokes a provider.

use crate::context::WorkflowContext;
use crate::error::NodeError;
use crate::event::WorkflowEvent;
use crate::node::WorkflowNode;
use async_trait::async_trait;
use cortex_llm::{
    ProviderError, ProviderMessage, ProviderRequest, ProviderResponse, ProviderStreamEvent,
};
use futures_util::future::BoxFuture;
use futures_util::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;

/// A type-erased `Provider::complete` call. `Provider` itself uses RPITIT
/// and isn't object-safe; this is the same boxed-future erasure
/// `cortex_core::Operator` uses to cross that boundary, scoped to just
/// the one method a node needs.
pub type BoxedComplete = Arc<
    dyn Fn(ProviderRequest) -> BoxFuture<'static, Result<ProviderResponse, ProviderError>>
        + Send
        + Sync,
>;

/// A type-erased `Provider::chat` call, same erasure as [`BoxedComplete`]
/// but for the streaming method.
pub type BoxedChat = Arc<
    dyn Fn(
            ProviderRequest,
        ) -> BoxFuture<
            'static,
            Result<Pin<Box<dyn Stream<Item = Result<ProviderStreamEvent, ProviderError>> + Send>>, ProviderError>,
        > + Send
        + Sync,
>;

/// Erase a concrete `Provider` into a [`BoxedComplete`] for use in an
/// [`LlmNode`].
pub fn erase_provider<P>(provider: Arc<P>) -> BoxedComplete
where
    P: cortex_llm::Provider + Send + Sync + 'static,
{
    Arc::new(move |request| {
        let provider = provider.clone();
        Box::pin(async move { provider.complete(request).await })
    })
}

/// Erase a concrete `Provider` into a [`BoxedChat`] for use in an
/// [`LlmNode`] that streams tokens via [`LlmNode::with_streaming`].
pub fn erase_provider_chat<P>(provider: Arc<P>) -> BoxedChat
where
    P: cortex_llm::Provider + Send + Sync + 'static,
{
    Arc::new(move |request| {
        let provider = provider.clone();
        Box::pin(async move { provider.chat(request).await })
    })
}

/// Builds the message list for one [`LlmNode`] call from the node's
/// input and the frozen context.
pub type MessagesFn =
    Arc<dyn Fn(&Value, &WorkflowContext) -> Vec<ProviderMessage> + Send + Sync>;

/// A workflow node that calls an LLM provider.
///
/// When `output_schema` is set, the response content is passed through
/// [`cortex_llm::extract_json`] and validated against the schema before
/// being returned; otherwise the raw text content is returned as a JSON
/// string value.
pub struct LlmNode {
    name: String,
    complete: BoxedComplete,
    chat: Option<BoxedChat>,
    model: Option<String>,
    system: Option<String>,
    messages: MessagesFn,
    output_schema: Option<Value>,
}

impl LlmNode {
    /// Construct a node named `name` that calls `complete` for each
    /// input, building its request via `messages`.
    pub fn new(name: impl Into<String>, complete: BoxedComplete, messages: MessagesFn) -> Self {
        LlmNode {
            name: name.into(),
            complete,
            chat: None,
            model: None,
            system: None,
            messages,
            output_schema: None,
        }
    }

    /// Enables per-token streaming. Under [`crate::executor::execute_streaming`]
    /// the node drives `chat` instead of `complete`, emitting a
    /// [`WorkflowEvent::LlmToken`] per content delta; under plain
    /// [`crate::executor::invoke`] (no token sink present) it still falls
    /// back to `complete`.
    pub fn with_streaming(mut self, chat: BoxedChat) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Sets the model to request.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a system prompt for every call this node makes.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Requires the response content to parse and validate against a
    /// JSON Schema, returning the parsed value instead of raw text.
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Drives `chat`, forwarding each content delta to `sink` as an
    /// `LlmToken` event and accumulating the full response text.
    async fn stream_tokens(
        &self,
        request: ProviderRequest,
        chat: &BoxedChat,
        sink: &tokio::sync::mpsc::UnboundedSender<WorkflowEvent>,
    ) -> Result<String, NodeError> {
        use futures_util::StreamExt;

        let mut stream = chat(request).await.map_err(|e| NodeError::new(e.to_string()))?;
        let mut text = String::new();
        let mut token_index = 0usize;

        while let Some(event) = stream.next().await {
            match event.map_err(|e| NodeError::new(e.to_string()))? {
                ProviderStreamEvent::Content { delta, .. } => {
                    text.push_str(&delta);
                    let _ = sink.send(WorkflowEvent::LlmToken {
                        node_name: self.name.clone(),
                        delta,
                        token_index,
                    });
                    token_index += 1;
                }
                ProviderStreamEvent::Done { .. } => break,
                _ => {}
            }
        }

        Ok(text)
    }
}

#[async_trait]
impl WorkflowNode for LlmNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: (self.messages)(&input, ctx),
            tools: Vec::new(),
            max_tokens: None,
            temperature: None,
            system: self.system.clone(),
            extra: Value::Null,
        };

        let text = match (&self.chat, &ctx.token_sink) {
            (Some(chat), Some(sink)) => self.stream_tokens(request, chat, sink).await?,
            _ => {
                let response = (self.complete)(request)
                    .await
                    .map_err(|e| NodeError::new(e.to_string()))?;
                response
                    .content
                    .iter()
                    .filter_map(|part| match part {
                        cortex_llm::ContentPart::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect()
            }
        };

        match &self.output_schema {
            None => Ok(Value::String(text)),
            Some(schema) => {
                let parsed = cortex_llm::extract_json(&text).map_err(|e| NodeError::new(e.to_string()))?;
                let compiled = jsonschema::validator_for(schema)
                    .map_err(|e| NodeError::new(format!("invalid output schema: {e}")))?;
                if let Err(first) = compiled.validate(&parsed) {
                    return Err(NodeError::new(format!(
                        "output failed schema validation: {first}"
                    )));
                }
                Ok(parsed)
            }
        }
    }
}
