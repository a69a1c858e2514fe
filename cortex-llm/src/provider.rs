//! Provider trait for LLM backends.
//!
//! The [`Provider`] trait uses RPITIT (return-position `impl Trait` in traits)
//! and is intentionally NOT object-safe. Object-safe consumption happens at
//! the `cortex_core::Operator` boundary — `cortex-react`'s ReAct loop is
//! generic over `P: Provider`.
//!
//! [`Provider::chat`] yields [`ProviderStreamEvent`] rather than
//! `cortex_stream::StreamChunk` directly — `cortex-stream` depends on this
//! crate for [`crate::StopReason`]/[`crate::TokenUsage`], so the wire-facing
//! chunk type can't also depend back on it. `ProviderStreamEvent` is the
//! provider-shaped subset (model text/tool-call deltas, no orchestration
//! concepts like tool results or approvals); `cortex-stream` converts each
//! event into a `StreamChunk` as it forwards the stream to a consumer.

use crate::types::{ProviderRequest, ProviderResponse, StopReason, TokenUsage};
use futures::Stream;
use std::future::Future;
use thiserror::Error;

/// Errors from LLM providers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP or network request failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Provider rate-limited the request.
    #[error("rate limited")]
    RateLimited,

    /// Authentication/authorization failed.
    #[error("auth failed: {0}")]
    AuthFailed(String),

    /// Could not parse the provider's response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The provider adapter doesn't implement this operation (e.g. an
    /// embeddings call against a chat-only adapter).
    #[error("unsupported by this provider: {0}")]
    UnsupportedProvider(String),

    /// No credential was found for this provider: not passed explicitly and
    /// not present in the provider's environment variable.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Whether retrying this request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited | ProviderError::RequestFailed(_)
        )
    }
}

/// A single event in a provider's chat stream — the provider-shaped subset
/// of `cortex_stream::StreamChunk` (no tool results or approvals, which are
/// constructed by the consumer running the tool, not the provider).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderStreamEvent {
    /// Incremental assistant text.
    Content {
        /// The text delta.
        delta: String,
        /// Index of the content block this delta belongs to, for interleaved blocks.
        index: Option<usize>,
    },
    /// Incremental tool-call construction (name and/or argument fragments).
    ToolCallDelta {
        /// Unique id for this tool call, stable across its deltas.
        id: String,
        /// Tool name, present once the model has named it.
        name: Option<String>,
        /// Fragment of the JSON-encoded arguments.
        arguments_delta: Option<String>,
    },
    /// Incremental reasoning/thinking text (providers that expose it).
    Thinking {
        /// The thinking text delta.
        delta: String,
    },
    /// Stream completed normally.
    Done {
        /// Why generation stopped, when known.
        finish_reason: Option<StopReason>,
        /// Final token usage, when known.
        usage: Option<TokenUsage>,
    },
}

/// A single embedding vector plus the usage it cost to compute.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    /// The embedding vectors, one per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Input tokens consumed computing the embeddings.
    pub input_tokens: u64,
}

/// What a model supports, used by callers to pick a model or fail fast
/// instead of discovering a gap from a provider error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelCapabilities {
    /// The model accepts a streaming `chat` call.
    pub streaming: bool,
    /// The model accepts tool/function-calling schemas.
    pub tools: bool,
    /// The model accepts image content parts.
    pub vision: bool,
    /// Approximate context window, in tokens.
    pub max_context_tokens: u32,
}

impl Default for ModelCapabilities {
    /// Conservative defaults for an unrecognized model: text-only, no tools.
    fn default() -> Self {
        Self {
            streaming: true,
            tools: false,
            vision: false,
            max_context_tokens: 4_096,
        }
    }
}

/// LLM provider interface.
///
/// Each provider (Anthropic, OpenAI, Ollama) implements this trait.
/// Provider-native features (truncation, caching, thinking blocks)
/// are handled by the provider impl using `ProviderRequest.extra`.
///
/// This trait uses RPITIT and is NOT object-safe. That's intentional —
/// the operator built on top of it is generic, and the object-safe boundary
/// is `cortex_core::Operator`.
pub trait Provider: Send + Sync {
    /// Send a completion request to the provider, returning the full
    /// response once generation finishes.
    fn complete(
        &self,
        request: ProviderRequest,
    ) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + Send;

    /// Send a completion request and stream back [`ProviderStreamEvent`]s
    /// as they arrive, ending with a `Done` event (or an `Err` if the
    /// stream fails partway through).
    fn chat(
        &self,
        request: ProviderRequest,
    ) -> impl Future<
        Output = Result<
            std::pin::Pin<Box<dyn Stream<Item = Result<ProviderStreamEvent, ProviderError>> + Send>>,
            ProviderError,
        >,
    > + Send;

    /// Embed a single string. Default delegates to [`Provider::generate_batch_embeddings`].
    fn generate_embedding(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<EmbeddingResult, ProviderError>> + Send {
        async move { self.generate_batch_embeddings(&[text.to_string()]).await }
    }

    /// Embed a batch of strings, preserving input order. Providers with no
    /// embeddings endpoint (e.g. Anthropic) return `UnsupportedProvider`.
    fn generate_batch_embeddings(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<EmbeddingResult, ProviderError>> + Send;

    /// What the given model supports. The default is a conservative
    /// text-only, no-tools capability set; providers override this with
    /// their real per-model table.
    fn capabilities(&self, _model: &str) -> ModelCapabilities {
        ModelCapabilities::default()
    }
}
