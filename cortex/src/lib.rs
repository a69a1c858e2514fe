#![deny(missing_docs)]
//! # cortex — umbrella crate
//!
//! Single import surface for the cortex agent orchestration framework.
//! Re-exports protocol and key implementations behind feature flags, plus a
//! `prelude` for the happy path.

#[cfg(feature = "core")]
pub use cortex_core;
#[cfg(feature = "core")]
pub use cortex_context;
#[cfg(feature = "hooks")]
pub use cortex_hooks;
#[cfg(feature = "core")]
pub use cortex_llm;
#[cfg(feature = "memory")]
pub use cortex_memory;
#[cfg(feature = "op-react")]
pub use cortex_react;
#[cfg(feature = "orch-local")]
pub use cortex_orch_local;
#[cfg(feature = "provider-anthropic")]
pub use cortex_provider_anthropic;
#[cfg(feature = "provider-ollama")]
pub use cortex_provider_ollama;
#[cfg(feature = "provider-openai")]
pub use cortex_provider_openai;
#[cfg(feature = "core")]
pub use cortex_retry;
#[cfg(feature = "state-memory")]
pub use cortex_state_memory;
#[cfg(feature = "core")]
pub use cortex_stream;
#[cfg(feature = "core")]
pub use cortex_tool;
#[cfg(feature = "workflow")]
pub use cortex_workflow;

/// Installs a `tracing-subscriber` `fmt` subscriber as the global default,
/// for binaries, examples, and tests that want cortex's tracing output
/// without assembling their own subscriber.
///
/// Span-timing events from [`cortex_hooks::TracingHook`] only fire when
/// `CORTEX_ENABLE_TRACING` is set (see that hook's docs) — this function
/// only controls whether anything is listening, not whether cortex emits.
/// Filtering of what's printed still follows `RUST_LOG` (`info` if unset).
///
/// Safe to call more than once; only the first call installs a subscriber.
#[cfg(feature = "tracing-init")]
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

/// Happy-path imports for composing cortex systems.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use cortex_core::{
        AgentId, Content, ContentBlock, Effect, ExitReason, Hook, HookAction, HookContext,
        HookPoint, Operator, OperatorConfig, OperatorInput, OperatorOutput, Scope, SessionId,
        StateReader, StateStore, WorkflowId,
    };

    #[cfg(feature = "core")]
    pub use cortex_llm::provider::{Provider, ProviderError};

    #[cfg(feature = "core")]
    pub use cortex_tool::{ToolDyn, ToolError, ToolRegistry};

    #[cfg(feature = "hooks")]
    pub use cortex_hooks::{HookRegistry, TracingHook};

    #[cfg(feature = "core")]
    pub use cortex_retry::{with_retry, RateLimiter, RateLimiterConfig, RetryConfig};

    #[cfg(feature = "op-react")]
    pub use cortex_react::{ReactConfig, ReactOperator};

    #[cfg(feature = "orch-local")]
    pub use cortex_orch_local::LocalOrch;

    #[cfg(feature = "workflow")]
    pub use cortex_workflow::{
        execute_streaming, invoke, CompiledWorkflow, ExecuteOptions, WorkflowGraph,
        WorkflowOutcome,
    };

    #[cfg(feature = "state-memory")]
    pub use cortex_state_memory::MemoryStore;

    #[cfg(feature = "memory")]
    pub use cortex_memory::{
        ContextBundle, MemoryManager, MemoryManagerConfig, RecallOptions, RememberOptions,
    };
}
