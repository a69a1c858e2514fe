//! SSE streaming support for the OpenAI Chat Completions API.
//!
//! OpenAI's stream is simpler than Anthropic's: every event is a bare
//! `data: {...}` line (no `event:` line), terminated by a `data: [DONE]`
//! sentinel.
//!
//! Reference: <https://platform.openai.com/docs/api-reference/chat/streaming>

use bytes::Bytes;
use cortex_llm::provider::{ProviderError, ProviderStreamEvent};
use cortex_llm::{StopReason, TokenUsage};
use futures::Stream;

use crate::types::OpenAIStreamChunk;

/// Turn a raw SSE byte stream from the Chat Completions API into a stream of
/// [`ProviderStreamEvent`]s, ending with `Done`.
pub(crate) fn parse_sse_stream(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
) -> impl Stream<Item = Result<ProviderStreamEvent, ProviderError>> + Send + 'static {
    async_stream::stream! {
        use futures::StreamExt;

        let mut bytes_stream = std::pin::pin!(byte_stream);
        let mut line_buf = String::new();
        let mut finish_reason: Option<StopReason> = None;
        let mut usage: Option<TokenUsage> = None;
        let mut tool_call_ids: std::collections::HashMap<usize, String> = std::collections::HashMap::new();

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
                let line = line_buf[..newline_pos].trim_end_matches('\r').to_string();
                line_buf.drain(..=newline_pos);

                let Some(data) = line.strip_prefix("data: ") else { continue };
                if data == "[DONE]" {
                    yield Ok(ProviderStreamEvent::Done { finish_reason: finish_reason.take(), usage: usage.take() });
                    return;
                }
                if data.is_empty() {
                    continue;
                }

                let parsed: OpenAIStreamChunk = match serde_json::from_str(data) {
                    Ok(v) => v,
                    Err(e) => {
                        yield Err(ProviderError::InvalidResponse(format!("JSON parse error in SSE: {e}")));
                        continue;
                    }
                };

                if let Some(u) = parsed.usage {
                    usage = Some(TokenUsage {
                        input_tokens: u.prompt_tokens,
                        output_tokens: u.completion_tokens,
                        cache_read_tokens: u.prompt_tokens_details.and_then(|d| d.cached_tokens),
                        cache_creation_tokens: None,
                    });
                }

                for choice in parsed.choices {
                    if let Some(reason) = choice.finish_reason {
                        finish_reason = Some(match reason.as_str() {
                            "tool_calls" => StopReason::ToolUse,
                            "length" => StopReason::MaxTokens,
                            "content_filter" => StopReason::ContentFilter,
                            _ => StopReason::EndTurn,
                        });
                    }
                    if let Some(text) = choice.delta.content {
                        yield Ok(ProviderStreamEvent::Content { delta: text, index: None });
                    }
                    if let Some(tool_calls) = choice.delta.tool_calls {
                        for tc in tool_calls {
                            let id = match tc.id {
                                Some(id) => {
                                    tool_call_ids.insert(tc.index, id.clone());
                                    id
                                }
                                None => tool_call_ids.get(&tc.index).cloned().unwrap_or_default(),
                            };
                            let (name, arguments_delta) = match tc.function {
                                Some(f) => (f.name, f.arguments),
                                None => (None, None),
                            };
                            yield Ok(ProviderStreamEvent::ToolCallDelta { id, name, arguments_delta });
                        }
                    }
                }
            }
        }

        yield Ok(ProviderStreamEvent::Done { finish_reason: finish_reason.take(), usage: usage.take() });
    }
}
