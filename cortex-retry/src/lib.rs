#![deny(missing_docs)]
//! Retry/backoff and rate limiting for provider calls.
//!
//! `with_retry` wraps a fallible async operation (typically a
//! [`cortex_llm::Provider::complete`] call, or whatever establishes a
//! `cortex-stream` connection) with exponential backoff, jitter, and
//! `Retry-After` override. A failure *before* a stream starts is
//! naturally covered by wrapping the call that opens it; a failure
//! *mid-stream* surfaces as a `StreamChunk::Error` item further down in
//! `cortex-stream` and is not re-issued here — by the time a consumer
//! sees it, earlier chunks have already been observed and retrying would
//! replay them.
//!
//! [`RateLimiter`] is the companion sliding-window limiter; it has no
//! opinion on what "a request" means to the caller, only on counting them.

pub mod classify;
pub mod policy;
pub mod rate_limiter;
pub mod retry;

pub use classify::{message_is_retryable, status_is_retryable, Retryable, RetryAfter};
pub use policy::RetryConfig;
pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterError};
pub use retry::{with_retry, with_retry_cancellable, RetryError};
