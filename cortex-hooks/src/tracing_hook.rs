//! An observability [`Hook`] that emits `tracing` spans, gated by
//! `CORTEX_ENABLE_TRACING`.
//!
//! Mirrors the OTel GenAI semantic-convention span names (`gen_ai.chat`,
//! `gen_ai.execute_tool`) without pulling in an OpenTelemetry exporter —
//! callers who want OTel export attach their own `tracing-opentelemetry`
//! subscriber; this hook just produces the spans and events to feed it.

use crate::HookRegistry;
use async_trait::async_trait;
use cortex_core::error::HookError;
use cortex_core::hook::{Hook, HookAction, HookContext, HookPoint};

const ENV_VAR: &str = "CORTEX_ENABLE_TRACING";

fn tracing_enabled() -> bool {
    matches!(
        std::env::var(ENV_VAR).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

/// Emits a `gen_ai.*` span per hook point. Never intervenes — always
/// returns `HookAction::Continue`.
///
/// Reads `CORTEX_ENABLE_TRACING` once, at construction. Set it before
/// building the hook registry; a hook already built won't notice the
/// variable changing at runtime.
pub struct TracingHook {
    points: Vec<HookPoint>,
    enabled: bool,
}

impl TracingHook {
    /// Create a tracing hook covering every hook point.
    pub fn new() -> Self {
        Self {
            points: vec![
                HookPoint::PreInference,
                HookPoint::PostInference,
                HookPoint::PreToolUse,
                HookPoint::PostToolUse,
                HookPoint::ExitCheck,
            ],
            enabled: tracing_enabled(),
        }
    }

    /// Register this hook on `registry` only if `CORTEX_ENABLE_TRACING`
    /// is set — otherwise the registry is left untouched, so a disabled
    /// `TracingHook` doesn't even take a dispatch slot in the pipeline.
    pub fn register_if_enabled(registry: &mut HookRegistry) {
        let hook = Self::new();
        if hook.enabled {
            registry.add(std::sync::Arc::new(hook));
        }
    }
}

impl Default for TracingHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hook for TracingHook {
    fn points(&self) -> &[HookPoint] {
        &self.points
    }

    async fn on_event(&self, ctx: &HookContext) -> Result<HookAction, HookError> {
        if !self.enabled {
            return Ok(HookAction::Continue);
        }

        match ctx.point {
            HookPoint::PreInference => {
                tracing::info_span!(
                    "gen_ai.chat",
                    gen_ai.system = "cortex",
                    turn = ctx.turns_completed,
                    tokens_used = ctx.tokens_used,
                )
                .in_scope(|| tracing::debug!("pre-inference"));
            }
            HookPoint::PostInference => {
                tracing::info_span!(
                    "gen_ai.chat",
                    gen_ai.system = "cortex",
                    tokens_used = ctx.tokens_used,
                    cost = %ctx.cost,
                    elapsed_ms = ctx.elapsed.as_millis(),
                )
                .in_scope(|| tracing::debug!("post-inference"));
            }
            HookPoint::PreToolUse => {
                tracing::info_span!(
                    "gen_ai.execute_tool",
                    gen_ai.system = "cortex",
                    gen_ai.tool.name = ctx.tool_name.as_deref().unwrap_or("unknown"),
                )
                .in_scope(|| tracing::debug!("pre-tool-use"));
            }
            HookPoint::PostToolUse => {
                tracing::info_span!(
                    "gen_ai.execute_tool",
                    gen_ai.system = "cortex",
                    gen_ai.tool.name = ctx.tool_name.as_deref().unwrap_or("unknown"),
                )
                .in_scope(|| tracing::debug!("post-tool-use"));
            }
            HookPoint::ExitCheck => {
                tracing::debug!(
                    turns_completed = ctx.turns_completed,
                    elapsed_ms = ctx.elapsed.as_millis(),
                    "exit-check"
                );
            }
            _ => {}
        }

        Ok(HookAction::Continue)
    }
}
