#![deny(missing_docs)]
//! Stream combinators and SSE framing for chunked agent output.
//!
//! This crate has no opinion on how a chunk stream is produced (a provider
//! adapter's raw SSE body, a replayed recording, a test fixture) — it only
//! defines the chunk shape ([`StreamChunk`]), the SSE wire framing
//! ([`format_sse`]/[`parse_sse`]), and the combinators consumers compose to
//! shape a stream before it reaches a UI or another service.

pub mod chunk;
pub mod ops;
pub mod sse;

pub use chunk::{StreamChunk, StreamError};
pub use ops::{
    buffer_stream, chat_stream, collect_content, filter_stream, merge_streams, tap_stream,
    tee_stream, transform_stream, BufferedStream, ChunkStream, CollectedContent,
};
pub use sse::{format_sse, parse_sse, to_readable_stream, to_sse_stream};
