//! SSE streaming support for the Anthropic Messages API.
//!
//! Parses the Server-Sent Events stream Anthropic sends when a request has
//! `"stream": true` and maps each event to a [`ProviderStreamEvent`].
//!
//! Reference: <https://docs.anthropic.com/en/api/messages-streaming>

use std::collections::HashMap;

use bytes::Bytes;
use cortex_llm::provider::{ProviderError, ProviderStreamEvent};
use cortex_llm::{StopReason, TokenUsage};
use futures::Stream;

/// Turn a raw SSE byte stream from the Anthropic API into a stream of
/// [`ProviderStreamEvent`]s, ending with `Done`.
pub(crate) fn parse_sse_stream(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
) -> impl Stream<Item = Result<ProviderStreamEvent, ProviderError>> + Send + 'static {
    async_stream::stream! {
        use futures::StreamExt;

        let mut state = SseParserState::new();
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
                let line = line_buf[..newline_pos].trim_end_matches('\r').to_string();
                line_buf.drain(..=newline_pos);

                for event in state.process_line(&line) {
                    yield event;
                }
            }
        }

        if !line_buf.trim().is_empty() {
            for event in state.process_line(line_buf.trim().to_string().as_str()) {
                yield event;
            }
        }

        yield Ok(ProviderStreamEvent::Done {
            finish_reason: state.stop_reason.take(),
            usage: state.usage.take(),
        });
    }
}

/// Tracks in-progress streaming state across SSE events.
struct SseParserState {
    current_event_type: Option<String>,
    current_data: String,
    tool_names: HashMap<usize, String>,
    stop_reason: Option<StopReason>,
    usage: Option<TokenUsage>,
}

impl SseParserState {
    fn new() -> Self {
        Self {
            current_event_type: None,
            current_data: String::new(),
            tool_names: HashMap::new(),
            stop_reason: None,
            usage: None,
        }
    }

    fn process_line(&mut self, line: &str) -> Vec<Result<ProviderStreamEvent, ProviderError>> {
        if line.is_empty() {
            return self.dispatch_event();
        }

        if let Some(event_type) = line.strip_prefix("event: ") {
            self.current_event_type = Some(event_type.trim().to_string());
        } else if let Some(data) = line.strip_prefix("data: ") {
            if !self.current_data.is_empty() {
                self.current_data.push('\n');
            }
            self.current_data.push_str(data.trim());
        }

        vec![]
    }

    fn dispatch_event(&mut self) -> Vec<Result<ProviderStreamEvent, ProviderError>> {
        let event_type = match self.current_event_type.take() {
            Some(t) => t,
            None => {
                self.current_data.clear();
                return vec![];
            }
        };
        let data = std::mem::take(&mut self.current_data);

        if data.is_empty() || data == "[DONE]" {
            return vec![];
        }

        let json: serde_json::Value = match serde_json::from_str(&data) {
            Ok(v) => v,
            Err(e) => {
                return vec![Err(ProviderError::InvalidResponse(format!(
                    "JSON parse error in SSE: {e}"
                )))]
            }
        };

        match event_type.as_str() {
            "content_block_start" => self.handle_content_block_start(&json),
            "content_block_delta" => self.handle_content_block_delta(&json),
            "message_delta" => self.handle_message_delta(&json),
            "error" => {
                let msg = json["error"]["message"]
                    .as_str()
                    .unwrap_or("unknown streaming error")
                    .to_string();
                vec![Err(ProviderError::RequestFailed(msg))]
            }
            _ => vec![],
        }
    }

    fn handle_content_block_start(
        &mut self,
        json: &serde_json::Value,
    ) -> Vec<Result<ProviderStreamEvent, ProviderError>> {
        let index = json["index"].as_u64().unwrap_or(0) as usize;
        let block = &json["content_block"];
        if block["type"].as_str() == Some("tool_use") {
            let id = block["id"].as_str().unwrap_or("").to_string();
            let name = block["name"].as_str().unwrap_or("").to_string();
            self.tool_names.insert(index, id.clone());
            return vec![Ok(ProviderStreamEvent::ToolCallDelta {
                id,
                name: Some(name),
                arguments_delta: None,
            })];
        }
        vec![]
    }

    fn handle_content_block_delta(
        &mut self,
        json: &serde_json::Value,
    ) -> Vec<Result<ProviderStreamEvent, ProviderError>> {
        let index = json["index"].as_u64().unwrap_or(0) as usize;
        let delta = &json["delta"];
        match delta["type"].as_str().unwrap_or("") {
            "text_delta" => {
                let text = delta["text"].as_str().unwrap_or("").to_string();
                vec![Ok(ProviderStreamEvent::Content {
                    delta: text,
                    index: Some(index),
                })]
            }
            "thinking_delta" => {
                let thinking = delta["thinking"].as_str().unwrap_or("").to_string();
                vec![Ok(ProviderStreamEvent::Thinking { delta: thinking })]
            }
            "input_json_delta" => {
                let partial = delta["partial_json"].as_str().unwrap_or("").to_string();
                let id = self.tool_names.get(&index).cloned().unwrap_or_default();
                vec![Ok(ProviderStreamEvent::ToolCallDelta {
                    id,
                    name: None,
                    arguments_delta: Some(partial),
                })]
            }
            _ => vec![],
        }
    }

    fn handle_message_delta(
        &mut self,
        json: &serde_json::Value,
    ) -> Vec<Result<ProviderStreamEvent, ProviderError>> {
        if let Some(reason) = json["delta"]["stop_reason"].as_str() {
            self.stop_reason = Some(match reason {
                "tool_use" => StopReason::ToolUse,
                "max_tokens" => StopReason::MaxTokens,
                _ => StopReason::EndTurn,
            });
        }
        if let Some(usage_val) = json.get("usage") {
            self.usage = Some(TokenUsage {
                input_tokens: usage_val["input_tokens"].as_u64().unwrap_or(0),
                output_tokens: usage_val["output_tokens"].as_u64().unwrap_or(0),
                cache_read_tokens: usage_val["cache_read_input_tokens"].as_u64(),
                cache_creation_tokens: usage_val["cache_creation_input_tokens"].as_u64(),
            });
        }
        vec![]
    }
}
