//! Newline-delimited JSON streaming support for the Ollama `/api/chat` endpoint.
//!
//! Unlike the SSE providers, a streaming Ollama response is a sequence of
//! bare JSON objects separated by newlines, each shaped like the
//! non-streaming [`crate::types::OllamaResponse`] but carrying only the
//! incremental slice of `message.content` for that line. The line with
//! `"done": true` carries the final timing/usage fields.

use bytes::Bytes;
use cortex_llm::provider::{ProviderError, ProviderStreamEvent};
use cortex_llm::{StopReason, TokenUsage};
use futures::Stream;
use uuid::Uuid;

use crate::types::OllamaResponse;

/// Turn a raw NDJSON byte stream from `/api/chat` into a stream of
/// [`ProviderStreamEvent`]s, ending with `Done`.
pub(crate) fn parse_ndjson_stream(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
) -> impl Stream<Item = Result<ProviderStreamEvent, ProviderError>> + Send + 'static {
    async_stream::stream! {
        use futures::StreamExt;

        let mut bytes_stream = std::pin::pin!(byte_stream);
        let mut line_buf = String::new();

        while let Some(chunk_result) = bytes_stream.next().await {
            let chunk = match chunk_result {
                Ok(b) => b,
                Err(e) => {
                    yield Err(ProviderError::RequestFailed(format!("stream read error: {e}")));
                    return;
                }
            };
            let chunk_str = match std::str::from_utf8(&chunk) {
                Ok(s) => s,
                Err(e) => {
                    yield Err(ProviderError::InvalidResponse(format!("UTF-8 decode error: {e}")));
                    return;
                }
            };
            line_buf.push_str(chunk_str);

            while let Some(newline_pos) = line_buf.find('\n') {
                let line = line_buf[..newline_pos].to_string();
                line_buf.drain(..=newline_pos);
                if line.trim().is_empty() {
                    continue;
                }
                for event in parse_line(&line) {
                    let is_done = matches!(event, Ok(ProviderStreamEvent::Done { .. }));
                    yield event;
                    if is_done {
                        return;
                    }
                }
            }
        }
    }
}

fn parse_line(line: &str) -> Vec<Result<ProviderStreamEvent, ProviderError>> {
    let response: OllamaResponse = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return vec![Err(ProviderError::InvalidResponse(format!(
                "NDJSON parse error: {e}"
            )))]
        }
    };

    let mut events = Vec::new();

    if !response.message.content.is_empty() {
        events.push(Ok(ProviderStreamEvent::Content {
            delta: response.message.content.clone(),
            index: None,
        }));
    }

    if let Some(tool_calls) = &response.message.tool_calls {
        for tc in tool_calls {
            events.push(Ok(ProviderStreamEvent::ToolCallDelta {
                id: Uuid::new_v4().to_string(),
                name: Some(tc.function.name.clone()),
                arguments_delta: Some(tc.function.arguments.to_string()),
            }));
        }
    }

    if response.done {
        let has_tool_calls = response
            .message
            .tool_calls
            .as_ref()
            .is_some_and(|tc| !tc.is_empty());
        let finish_reason = if has_tool_calls {
            StopReason::ToolUse
        } else {
            match response.done_reason.as_deref() {
                Some("length") => StopReason::MaxTokens,
                _ => StopReason::EndTurn,
            }
        };
        events.push(Ok(ProviderStreamEvent::Done {
            finish_reason: Some(finish_reason),
            usage: Some(TokenUsage {
                input_tokens: response.prompt_eval_count.unwrap_or(0),
                output_tokens: response.eval_count.unwrap_or(0),
                cache_read_tokens: None,
                cache_creation_tokens: None,
            }),
        }));
    }

    events
}
