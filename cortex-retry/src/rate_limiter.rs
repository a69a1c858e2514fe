//! Sliding-window request rate limiter.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Configuration for [`RateLimiter`]: at most `max_requests` acquisitions
/// in any trailing `window` of wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    /// Maximum acquisitions allowed within the window.
    pub max_requests: usize,
    /// Length of the trailing window.
    pub window: Duration,
}

/// An error raised while waiting to acquire a rate-limiter slot.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RateLimiterError {
    /// The caller's cancellation token fired before a slot opened up.
    #[error("rate limiter wait aborted")]
    Aborted,
}

/// Token/request counter over a sliding window.
///
/// Safe to share across tasks within one process via `Arc`; it is *not*
/// a substitute for a shared backing store across multiple processes —
/// each process-local limiter only sees its own history unless an
/// external limiter fronts it.
pub struct RateLimiter {
    config: RateLimiterConfig,
    history: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a new limiter with no prior history.
    pub fn new(config: RateLimiterConfig) -> Self {
        RateLimiter {
            config,
            history: Mutex::new(VecDeque::new()),
        }
    }

    async fn evict_expired(&self, history: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = history.front() {
            if now.duration_since(oldest) >= self.config.window {
                history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Non-blocking probe: would acquiring right now exceed the window?
    pub async fn would_exceed(&self) -> bool {
        let now = Instant::now();
        let mut history = self.history.lock().await;
        self.evict_expired(&mut history, now).await;
        history.len() >= self.config.max_requests
    }

    /// Resolve once a slot is available, sleeping until the oldest
    /// timestamp in the window falls outside it if the window is full.
    /// Aborts immediately with [`RateLimiterError::Aborted`] if `cancel`
    /// fires while waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), RateLimiterError> {
        loop {
            if cancel.is_cancelled() {
                return Err(RateLimiterError::Aborted);
            }

            let wait = {
                let now = Instant::now();
                let mut history = self.history.lock().await;
                self.evict_expired(&mut history, now).await;

                if history.len() < self.config.max_requests {
                    history.push_back(now);
                    return Ok(());
                }

                let oldest = *history.front().expect("len >= max_requests > 0");
                self.config.window.saturating_sub(now.duration_since(oldest))
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => return Err(RateLimiterError::Aborted),
            }
        }
    }

    /// Clear all recorded history, as if the limiter were freshly created.
    pub async fn reset(&self) {
        self.history.lock().await.clear();
    }
}
