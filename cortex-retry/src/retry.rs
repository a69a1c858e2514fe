//! `with_retry`: drives a fallible async operation through a [`RetryConfig`].

use crate::classify::Retryable;
use crate::policy::RetryConfig;
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors [`with_retry`] itself can produce, distinct from the wrapped
/// operation's own error type `E`.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation's own error, returned once retries are exhausted or
    /// the error was classified as non-retryable.
    #[error(transparent)]
    Operation(E),

    /// The supplied [`CancellationToken`] fired while waiting to retry.
    #[error("retry aborted")]
    Aborted,
}

/// Run `f` with retry per `cfg`. `f` receives the zero-indexed attempt
/// number so call sites can vary behavior (e.g. logging) across attempts.
///
/// A function that fails `m` times before succeeding is invoked exactly
/// `min(m, cfg.max_retries) + 1` times. A function that always fails is
/// invoked `cfg.max_retries + 1` times and the last error is returned.
pub async fn with_retry<F, Fut, T, E>(cfg: &RetryConfig, f: F) -> Result<T, RetryError<E>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    with_retry_cancellable(cfg, &CancellationToken::new(), f).await
}

/// Like [`with_retry`], but the wait before each retry is raced against
/// `cancel` — firing it aborts the pending sleep immediately with
/// [`RetryError::Aborted`] instead of letting the retry proceed.
pub async fn with_retry_cancellable<F, Fut, T, E>(
    cfg: &RetryConfig,
    cancel: &CancellationToken,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Aborted);
        }

        match f(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= cfg.max_retries || !err.is_retryable() {
                    return Err(RetryError::Operation(err));
                }
                let delay = err
                    .retry_after()
                    .map(|hint| hint.0)
                    .unwrap_or_else(|| cfg.delay_for(attempt + 1));

                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after failure"
                );

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(RetryError::Aborted),
                }
                attempt += 1;
            }
        }
    }
}
