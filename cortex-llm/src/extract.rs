//! Best-effort JSON extraction from free-form LLM text.
//!
//! Shared by any caller that asks a model for structured output: a
//! workflow LLM node validating against an `outputSchema`, or the ReAct
//! loop's own terminal structured-output pass. Models routinely wrap
//! their JSON in prose or a fenced code block, so extraction tries a
//! few strategies in order rather than assuming `serde_json::from_str`
//! on the raw content will just work.

use serde_json::Value;
use thiserror::Error;

/// Failure to locate or parse JSON in a model's response.
#[derive(Debug, Error)]
#[error("could not extract JSON from response: {reason}")]
pub struct ExtractError {
    /// What went wrong.
    pub reason: String,
    /// The raw content that failed to parse, for diagnostics.
    pub raw: String,
}

/// Extract a JSON value from `raw`, trying in order: the whole string as
/// JSON, a fenced ```json``` (or bare ```` ``` ````) code block, then the
/// first balanced `{...}`/`[...]` substring.
pub fn extract_json(raw: &str) -> Result<Value, ExtractError> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(block) = fenced_code_block(trimmed) {
        if let Ok(value) = serde_json::from_str(&block) {
            return Ok(value);
        }
    }

    if let Some(substring) = first_balanced_substring(trimmed) {
        if let Ok(value) = serde_json::from_str(&substring) {
            return Ok(value);
        }
    }

    Err(ExtractError {
        reason: "no raw JSON, fenced block, or balanced substring parsed".into(),
        raw: raw.to_string(),
    })
}

fn fenced_code_block(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let after_lang = after_fence
        .strip_prefix("json")
        .unwrap_or(after_fence)
        .trim_start_matches('\n');
    let end = after_lang.find("```")?;
    Some(after_lang[..end].trim().to_string())
}

fn first_balanced_substring(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        let (open, close) = match b {
            b'{' => (b'{', b'}'),
            b'[' => (b'[', b']'),
            _ => continue,
        };
        let mut depth = 0i32;
        let mut in_string = false;
        let mut escaped = false;
        for (j, &c) in bytes[i..].iter().enumerate() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == b'\\' {
                    escaped = true;
                } else if c == b'"' {
                    in_string = false;
                }
                continue;
            }
            match c {
                b'"' => in_string = true,
                c if c == open => depth += 1,
                c if c == close => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(text[i..=i + j].to_string());
                    }
                }
                _ => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_raw_json() {
        let value = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[test]
    fn extracts_fenced_json_block() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nhope that helps";
        let value = extract_json(text).unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[test]
    fn extracts_bare_fenced_block() {
        let text = "```\n{\"a\": 2}\n```";
        let value = extract_json(text).unwrap();
        assert_eq!(value, serde_json::json!({"a": 2}));
    }

    #[test]
    fn extracts_first_balanced_substring_among_prose() {
        let text = "The answer is {\"a\": 3} according to my analysis.";
        let value = extract_json(text).unwrap();
        assert_eq!(value, serde_json::json!({"a": 3}));
    }

    #[test]
    fn balanced_substring_respects_braces_inside_strings() {
        let text = r#"prefix {"note": "use a { brace } here", "ok": true} suffix"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["ok"], serde_json::json!(true));
    }

    #[test]
    fn unparsable_text_is_an_error() {
        assert!(extract_json("not json at all").is_err());
    }
}
