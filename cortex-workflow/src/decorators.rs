//! Node decorators: wrap a node, return a node with the same interface.

use crate::context::WorkflowContext;
use crate::error::{NodeError, NodeExecutionError};
use crate::node::WorkflowNode;
use async_trait::async_trait;
use cortex_retry::RetryConfig;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

impl cortex_retry::Retryable for NodeError {
    fn is_retryable(&self) -> bool {
        cortex_retry::message_is_retryable(&self.0)
    }
}

struct RetryNode {
    inner: Arc<dyn WorkflowNode>,
    cfg: RetryConfig,
}

#[async_trait]
impl WorkflowNode for RetryNode {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError> {
        let inner = &self.inner;
        cortex_retry::with_retry(&self.cfg, |_attempt| {
            let input = input.clone();
            async move { inner.execute(input, ctx).await }
        })
        .await
        .map_err(|e| match e {
            cortex_retry::RetryError::Operation(source) => {
                NodeError::new(NodeExecutionError::new(self.inner.name(), source).to_string())
            }
            cortex_retry::RetryError::Aborted => NodeError::new("retry aborted"),
        })
    }
}

/// Wrap `node` so that a failing execution is retried per `cfg`. On
/// exhaustion the last error is wrapped in a [`NodeExecutionError`].
pub fn with_retry(node: Arc<dyn WorkflowNode>, cfg: RetryConfig) -> Arc<dyn WorkflowNode> {
    Arc::new(RetryNode { inner: node, cfg })
}

struct TimeoutNode {
    inner: Arc<dyn WorkflowNode>,
    duration: Duration,
}

#[async_trait]
impl WorkflowNode for TimeoutNode {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError> {
        match tokio::time::timeout(self.duration, self.inner.execute(input, ctx)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(NodeError::new(
                NodeExecutionError::new(self.inner.name(), NodeError::new("timed out")).to_string(),
            )),
        }
    }
}

/// Wrap `node` so execution races against `duration`. On expiry, the
/// node's own future is dropped without being cancelled cooperatively —
/// a node that wants to stop early on timeout must watch its own
/// cancellation signal.
pub fn with_timeout(node: Arc<dyn WorkflowNode>, duration: Duration) -> Arc<dyn WorkflowNode> {
    Arc::new(TimeoutNode {
        inner: node,
        duration,
    })
}

/// Decides whether a fallback should run after `primary` fails. Defaults
/// to always falling back when not supplied to [`with_fallback`].
pub type ShouldFallbackFn = Arc<dyn Fn(&NodeError) -> bool + Send + Sync>;

struct FallbackNode {
    primary: Arc<dyn WorkflowNode>,
    fallback: Arc<dyn WorkflowNode>,
    should_fallback: Option<ShouldFallbackFn>,
}

#[async_trait]
impl WorkflowNode for FallbackNode {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError> {
        match self.primary.execute(input.clone(), ctx).await {
            Ok(v) => Ok(v),
            Err(e) => {
                let should = self.should_fallback.as_ref().map_or(true, |f| f(&e));
                if should {
                    self.fallback.execute(input, ctx).await
                } else {
                    Err(e)
                }
            }
        }
    }
}

/// Run `primary`; on an error matched by `should_fallback` (default:
/// always), run `fallback` with the same input and context. Errors from
/// `fallback` itself propagate unwrapped.
pub fn with_fallback(
    primary: Arc<dyn WorkflowNode>,
    fallback: Arc<dyn WorkflowNode>,
    should_fallback: Option<ShouldFallbackFn>,
) -> Arc<dyn WorkflowNode> {
    Arc::new(FallbackNode {
        primary,
        fallback,
        should_fallback,
    })
}

/// State of a [`CircuitBreakerConfig`]-wrapped node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests pass through; failures accumulate toward the threshold.
    Closed,
    /// Requests fail fast without calling the wrapped node.
    Open,
    /// A limited number of trial requests are allowed through.
    HalfOpen,
}

/// Configuration for [`create_circuit_breaker`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures (in `Closed`) before tripping to `Open`.
    pub failure_threshold: usize,
    /// How long `Open` fails fast before trying `HalfOpen`.
    pub reset_timeout: Duration,
    /// Concurrent trial requests allowed while `HalfOpen`.
    pub half_open_max: usize,
}

struct BreakerState {
    state: CircuitState,
    failure_count: usize,
    last_failure_time: Option<Instant>,
    half_open_attempts: usize,
}

struct CircuitBreakerNode {
    inner: Arc<dyn WorkflowNode>,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    on_state_change: Option<Arc<dyn Fn(CircuitState) + Send + Sync>>,
}

impl CircuitBreakerNode {
    fn fire(&self, state: CircuitState) {
        if let Some(cb) = &self.on_state_change {
            cb(state);
        }
    }
}

#[async_trait]
impl WorkflowNode for CircuitBreakerNode {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError> {
        let allowed = {
            let mut s = self.state.lock().await;
            match s.state {
                CircuitState::Closed => true,
                CircuitState::Open => {
                    let reopen = s
                        .last_failure_time
                        .map(|t| t.elapsed() >= self.config.reset_timeout)
                        .unwrap_or(false);
                    if reopen {
                        s.state = CircuitState::HalfOpen;
                        s.half_open_attempts = 1;
                        drop(s);
                        self.fire(CircuitState::HalfOpen);
                        true
                    } else {
                        false
                    }
                }
                CircuitState::HalfOpen => {
                    if s.half_open_attempts < self.config.half_open_max {
                        s.half_open_attempts += 1;
                        true
                    } else {
                        false
                    }
                }
            }
        };

        if !allowed {
            return Err(NodeError::new("circuit breaker open"));
        }

        match self.inner.execute(input, ctx).await {
            Ok(v) => {
                let mut s = self.state.lock().await;
                let was_open = s.state != CircuitState::Closed;
                s.state = CircuitState::Closed;
                s.failure_count = 0;
                s.half_open_attempts = 0;
                drop(s);
                if was_open {
                    self.fire(CircuitState::Closed);
                }
                Ok(v)
            }
            Err(e) => {
                let mut s = self.state.lock().await;
                s.failure_count += 1;
                s.last_failure_time = Some(Instant::now());
                let should_open =
                    s.state == CircuitState::HalfOpen || s.failure_count >= self.config.failure_threshold;
                if should_open {
                    s.state = CircuitState::Open;
                }
                drop(s);
                if should_open {
                    self.fire(CircuitState::Open);
                }
                Err(e)
            }
        }
    }
}

/// Wrap `node` in a closed → open → half-open → closed|open circuit
/// breaker. `on_state_change` fires on every transition.
pub fn create_circuit_breaker(
    node: Arc<dyn WorkflowNode>,
    config: CircuitBreakerConfig,
    on_state_change: Option<Arc<dyn Fn(CircuitState) + Send + Sync>>,
) -> Arc<dyn WorkflowNode> {
    Arc::new(CircuitBreakerNode {
        inner: node,
        config,
        state: Mutex::new(BreakerState {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_time: None,
            half_open_attempts: 0,
        }),
        on_state_change,
    })
}

struct ErrorTransformNode {
    inner: Arc<dyn WorkflowNode>,
    transform: Arc<dyn Fn(NodeError) -> NodeError + Send + Sync>,
}

#[async_trait]
impl WorkflowNode for ErrorTransformNode {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError> {
        self.inner
            .execute(input, ctx)
            .await
            .map_err(|e| (self.transform)(e))
    }
}

/// Maps an error thrown by `node` through `f` without altering its
/// success path.
pub fn with_error_transform(
    node: Arc<dyn WorkflowNode>,
    f: Arc<dyn Fn(NodeError) -> NodeError + Send + Sync>,
) -> Arc<dyn WorkflowNode> {
    Arc::new(ErrorTransformNode {
        inner: node,
        transform: f,
    })
}

struct CatchErrorNode {
    inner: Arc<dyn WorkflowNode>,
    handler: Arc<dyn Fn(&NodeError, &Value, &WorkflowContext) -> Value + Send + Sync>,
}

#[async_trait]
impl WorkflowNode for CatchErrorNode {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError> {
        match self.inner.execute(input.clone(), ctx).await {
            Ok(v) => Ok(v),
            Err(e) => Ok((self.handler)(&e, &input, ctx)),
        }
    }
}

/// Converts an error from `node` into a fallback *output* rather than
/// propagating it, via `handler(err, input, ctx)`.
pub fn catch_error(
    node: Arc<dyn WorkflowNode>,
    handler: Arc<dyn Fn(&NodeError, &Value, &WorkflowContext) -> Value + Send + Sync>,
) -> Arc<dyn WorkflowNode> {
    Arc::new(CatchErrorNode {
        inner: node,
        handler,
    })
}
