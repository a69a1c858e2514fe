//! SSE framing: `data: <json>\n\n` encode/decode, `[DONE]` tolerated as a no-op.

use crate::chunk::{StreamChunk, StreamError};
use futures::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

/// Format a single chunk as an SSE `data:` frame.
pub fn format_sse(chunk: &StreamChunk) -> String {
    format!("data: {}\n\n", serde_json::to_string(chunk).unwrap_or_default())
}

/// Parse a single SSE frame's data payload into a [`StreamChunk`].
///
/// `[DONE]` is tolerated as a no-op (`Ok(None)`), matching the sentinel
/// providers emit to end their own SSE streams.
pub fn parse_sse(line: &str) -> Result<Option<StreamChunk>, StreamError> {
    let data = line.strip_prefix("data:").unwrap_or(line).trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }
    serde_json::from_str(data)
        .map(Some)
        .map_err(|e| StreamError::Sse(e.to_string()))
}

/// Turn a chunk stream into a stream of SSE-framed text lines.
pub fn to_sse_stream(
    stream: Pin<Box<dyn Stream<Item = Result<StreamChunk, StreamError>> + Send>>,
) -> Pin<Box<dyn Stream<Item = String> + Send>> {
    Box::pin(stream.map(|item| match item {
        Ok(chunk) => format_sse(&chunk),
        Err(e) => format!(
            "data: {}\n\n",
            serde_json::to_string(&StreamChunk::Error {
                message: e.to_string()
            })
            .unwrap_or_default()
        ),
    }))
}

/// Turn a chunk stream into a stream of owned byte frames suitable for
/// writing directly to an HTTP response body.
pub fn to_readable_stream(
    stream: Pin<Box<dyn Stream<Item = Result<StreamChunk, StreamError>> + Send>>,
) -> Pin<Box<dyn Stream<Item = Result<bytes::Bytes, StreamError>> + Send>> {
    Box::pin(stream.map(|item| item.map(|chunk| bytes::Bytes::from(format_sse(&chunk)))))
}
