//! Retry classification: which failures are worth retrying.

use cortex_llm::ProviderError;
use std::time::Duration;

/// A `Retry-After` hint resolved to a concrete wait duration (seconds form
/// or HTTP-date form, both resolved by the caller before construction).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryAfter(pub Duration);

/// Errors that can classify themselves as retryable, optionally carrying
/// a server-provided override for how long to wait before the retry.
pub trait Retryable {
    /// Whether another attempt might succeed.
    fn is_retryable(&self) -> bool;

    /// A provider-supplied wait hint (e.g. an HTTP `Retry-After` header)
    /// that should override the computed backoff delay when present.
    fn retry_after(&self) -> Option<RetryAfter> {
        None
    }
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        ProviderError::is_retryable(self)
    }
}

/// Substring classification for errors that haven't been typed into
/// [`ProviderError`] yet — transport-layer failures surfaced as plain
/// strings from a lower layer.
pub fn message_is_retryable(message: &str) -> bool {
    const CODES: &[&str] = &[
        "RATE_LIMIT_EXCEEDED",
        "TIMEOUT",
        "ECONNRESET",
        "ETIMEDOUT",
        "ENOTFOUND",
        "SERVICE_UNAVAILABLE",
        "INTERNAL_ERROR",
    ];
    const SUBSTRINGS: &[&str] = &["rate limit", "too many requests", "network", "timeout", "connection"];

    if CODES.iter().any(|code| message.contains(code)) {
        return true;
    }
    let lower = message.to_lowercase();
    SUBSTRINGS.iter().any(|s| lower.contains(s))
}

/// Whether an HTTP status code is retryable per the default policy.
pub fn status_is_retryable(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}
