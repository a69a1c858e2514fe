//! Exponential backoff with jitter and `Retry-After` override.

use rand::Rng;
use std::time::Duration;

/// Configuration for [`crate::with_retry`].
///
/// Mirrors the defaults a provider call site expects: three retries,
/// doubling delay starting at one second, capped at a minute, with 10%
/// jitter to avoid synchronized retry storms across callers.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Delay never exceeds this, regardless of attempt number.
    pub max_delay: Duration,
    /// Multiplier applied to the delay on each subsequent attempt.
    pub backoff_multiplier: f64,
    /// Fraction of the computed delay randomized in either direction.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(60_000),
            backoff_multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl RetryConfig {
    /// Delay before retry attempt `n` (1-indexed: the delay before the
    /// first retry is `delay_for(1)`), before any `Retry-After` override.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let base = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jittered = if self.jitter > 0.0 {
            let offset = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
            (capped * (1.0 + offset)).max(0.0)
        } else {
            capped
        };
        Duration::from_secs_f64(jittered)
    }
}
