#![deny(missing_docs)]
//! Provider-agnostic LLM call layer.
//!
//! This crate is the shared toolkit operator implementations build on:
//! the internal message/request/response types every provider adapter
//! converts to and from, the [`Provider`] trait providers implement, and
//! the [`ContextStrategy`] trait for managing conversation window size.
//! It has no opinion on retry/backoff (`cortex-retry`), streaming
//! (`cortex-stream`), or the ReAct loop itself (`cortex-react`) — those
//! are separate layers that compose on top.
//!
//! Key traits defined here:
//! - [`Provider`] — LLM provider interface (not object-safe, uses RPITIT)
//! - [`ContextStrategy`] — context window management

pub mod config;
pub mod context;
pub mod convert;
pub mod extract;
pub mod provider;
pub mod types;

// Re-exports
pub use config::CortexLlmConfig;
pub use context::{ContextStrategy, NoCompaction};
pub use convert::{
    content_block_to_part, content_part_to_block, content_to_parts, content_to_user_message,
    parts_to_content,
};
pub use extract::{extract_json, ExtractError};
pub use provider::{
    EmbeddingResult, ModelCapabilities, Provider, ProviderError, ProviderStreamEvent,
};
pub use types::*;
