//! The unit of a streamed agent response.

use cortex_llm::provider::ProviderStreamEvent;
use cortex_llm::{StopReason, TokenUsage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single chunk of a streamed response.
///
/// A stream of these is a lazy, finite, non-restartable sequence — consumers
/// treat it as a single-pass iterator, same as the provider SSE stream it is
/// ultimately derived from.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamChunk {
    /// Incremental assistant text.
    Content {
        /// The text delta.
        delta: String,
        /// Index of the content block this delta belongs to, for interleaved blocks.
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// Incremental tool-call construction (name and/or argument fragments).
    ToolCall {
        /// Unique id for this tool call, stable across its deltas.
        id: String,
        /// Tool name, present once the model has named it.
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Fragment of the JSON-encoded arguments.
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments_delta: Option<String>,
    },
    /// The result of executing a tool call.
    ToolResult {
        /// The tool_use id this result corresponds to.
        tool_use_id: String,
        /// The result content.
        content: String,
        /// Whether the tool execution errored.
        is_error: bool,
    },
    /// Incremental reasoning/thinking text (providers that expose it).
    Thinking {
        /// The thinking text delta.
        delta: String,
    },
    /// A tool call requires human approval before executing.
    ApprovalRequested {
        /// The pending tool_use id.
        tool_use_id: String,
        /// Tool name awaiting approval.
        tool_name: String,
        /// Fully assembled tool input.
        input: serde_json::Value,
    },
    /// A tool call's input has fully arrived and is ready to execute.
    ToolInputAvailable {
        /// The tool_use id.
        tool_use_id: String,
        /// Tool name.
        name: String,
        /// Fully assembled tool input.
        input: serde_json::Value,
    },
    /// Stream completed normally.
    Done {
        /// Why generation stopped, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<StopReason>,
        /// Final token usage, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
    },
    /// An error occurred; the stream ends after this chunk.
    Error {
        /// Human-readable error message.
        message: String,
    },
}

impl StreamChunk {
    /// The discriminant string this chunk serializes under, used by
    /// [`crate::ops::filter_stream`] without needing `serde_json` round-trips.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamChunk::Content { .. } => "content",
            StreamChunk::ToolCall { .. } => "tool_call",
            StreamChunk::ToolResult { .. } => "tool_result",
            StreamChunk::Thinking { .. } => "thinking",
            StreamChunk::ApprovalRequested { .. } => "approval-requested",
            StreamChunk::ToolInputAvailable { .. } => "tool-input-available",
            StreamChunk::Done { .. } => "done",
            StreamChunk::Error { .. } => "error",
        }
    }
}

impl From<ProviderStreamEvent> for StreamChunk {
    fn from(event: ProviderStreamEvent) -> Self {
        match event {
            ProviderStreamEvent::Content { delta, index } => StreamChunk::Content { delta, index },
            ProviderStreamEvent::ToolCallDelta {
                id,
                name,
                arguments_delta,
            } => StreamChunk::ToolCall {
                id,
                name,
                arguments_delta,
            },
            ProviderStreamEvent::Thinking { delta } => StreamChunk::Thinking { delta },
            ProviderStreamEvent::Done {
                finish_reason,
                usage,
            } => StreamChunk::Done {
                finish_reason,
                usage,
            },
        }
    }
}

/// Errors from stream operations.
#[non_exhaustive]
#[derive(Debug, Error, Clone)]
pub enum StreamError {
    /// The upstream provider stream failed.
    #[error("upstream stream error: {0}")]
    Upstream(String),

    /// SSE framing could not be parsed.
    #[error("sse parse error: {0}")]
    Sse(String),
}
