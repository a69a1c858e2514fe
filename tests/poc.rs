//! Proof of Concept: composability patterns without live API keys.
//!
//! Demonstrates core composability patterns that the cortex architecture
//! enables:
//!
//! 1. **Provider swap** — Same operator, different LLM backend
//! 2. **Tiered memory management** — remember/recall/consolidate composed
//!    independently of the request/response state store
//! 3. **Operator swap** — Same input, different operator implementation
//! 4. **Multi-agent orchestration** — Orchestrator dispatches to multiple agents
//!
//! All tests run without API keys by using mock/test implementations.

use cortex_context::SlidingWindow;
use cortex_core::content::Content;
use cortex_core::effect::Scope;
use cortex_core::id::AgentId;
use cortex_core::operator::{ExitReason, Operator, OperatorInput, OperatorOutput, TriggerType};
use cortex_core::orchestrator::Orchestrator;
use cortex_core::state::StateStore;
use cortex_core::test_utils::EchoOperator;
use cortex_hooks::HookRegistry;
use cortex_llm::provider::{Provider, ProviderError};
use cortex_llm::types::*;
use cortex_memory::{MemoryManager, MemoryManagerConfig, RecallOptions, RememberOptions};
use cortex_orch_local::LocalOrch;
use cortex_react::{ReactConfig, ReactOperator};
use cortex_state_memory::MemoryStore;
use cortex_tool::ToolRegistry;
use rust_decimal::Decimal;
use std::sync::Arc;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MockProvider — canned responses, no network
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct MockProvider {
    response: ProviderResponse,
}

impl MockProvider {
    fn new(response: ProviderResponse) -> Self {
        Self { response }
    }

    /// Create a MockProvider that returns a simple text response.
    fn text(text: &str) -> Self {
        Self::new(ProviderResponse {
            content: vec![ContentPart::Text {
                text: text.to_string(),
            }],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage {
                input_tokens: 25,
                output_tokens: 10,
                cache_read_tokens: None,
                cache_creation_tokens: None,
            },
            model: "mock-model".into(),
            cost: Some(Decimal::new(1, 4)), // $0.0001
            truncated: None,
        })
    }
}

impl Provider for MockProvider {
    fn complete(
        &self,
        _request: ProviderRequest,
    ) -> impl std::future::Future<Output = Result<ProviderResponse, ProviderError>> + Send {
        let response = self.response.clone();
        async move { Ok(response) }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Null state reader for ReactOperator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct NullStateReader;

#[async_trait::async_trait]
impl cortex_core::StateReader for NullStateReader {
    async fn read(
        &self,
        _scope: &Scope,
        _key: &str,
    ) -> Result<Option<serde_json::Value>, cortex_core::StateError> {
        Ok(None)
    }
    async fn list(
        &self,
        _scope: &Scope,
        _prefix: &str,
    ) -> Result<Vec<String>, cortex_core::StateError> {
        Ok(vec![])
    }
    async fn search(
        &self,
        _scope: &Scope,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<cortex_core::state::SearchResult>, cortex_core::StateError> {
        Ok(vec![])
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn simple_input(text: &str) -> OperatorInput {
    OperatorInput::new(Content::text(text), TriggerType::User)
}

fn react_config() -> ReactConfig {
    ReactConfig {
        system_prompt: "You are a helpful assistant.".into(),
        default_model: "mock-model".into(),
        default_max_tokens: 256,
        default_max_turns: 5,
        ..Default::default()
    }
}

fn make_react_operator(provider: MockProvider) -> ReactOperator<MockProvider> {
    ReactOperator::new(
        provider,
        ToolRegistry::new(),
        Box::new(SlidingWindow::new()),
        HookRegistry::new(),
        Arc::new(NullStateReader),
        react_config(),
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pattern 1: Provider Swap
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A second mock provider with different response characteristics,
/// simulating a different LLM backend.
struct MockProviderB {
    response: ProviderResponse,
}

impl MockProviderB {
    fn text(text: &str) -> Self {
        Self {
            response: ProviderResponse {
                content: vec![ContentPart::Text {
                    text: text.to_string(),
                }],
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage {
                    input_tokens: 30,
                    output_tokens: 15,
                    cache_read_tokens: None,
                    cache_creation_tokens: None,
                },
                model: "mock-model-b".into(),
                cost: Some(Decimal::new(2, 4)), // $0.0002
                truncated: None,
            },
        }
    }
}

impl Provider for MockProviderB {
    fn complete(
        &self,
        _request: ProviderRequest,
    ) -> impl std::future::Future<Output = Result<ProviderResponse, ProviderError>> + Send {
        let response = self.response.clone();
        async move { Ok(response) }
    }
}

#[tokio::test]
async fn provider_swap_same_config_different_backend() {
    // The SAME ReactConfig, ToolRegistry, HookRegistry, and context strategy.
    // Only the generic type parameter P (the provider) changes.
    let config = react_config();
    let tools = ToolRegistry::new();
    let hooks = HookRegistry::new();

    // Provider A: returns "Hello from A"
    let op_a: ReactOperator<MockProvider> = ReactOperator::new(
        MockProvider::text("Hello from provider A"),
        tools,
        Box::new(SlidingWindow::new()),
        hooks,
        Arc::new(NullStateReader),
        config,
    );

    let config_b = react_config();
    let tools_b = ToolRegistry::new();
    let hooks_b = HookRegistry::new();

    // Provider B: returns "Hello from B" with different token counts
    let op_b: ReactOperator<MockProviderB> = ReactOperator::new(
        MockProviderB::text("Hello from provider B"),
        tools_b,
        Box::new(SlidingWindow::new()),
        hooks_b,
        Arc::new(NullStateReader),
        config_b,
    );

    // Execute the same input through both
    let input_a = simple_input("Greet me");
    let input_b = simple_input("Greet me");

    let output_a = op_a.execute(input_a).await.unwrap();
    let output_b = op_b.execute(input_b).await.unwrap();

    // Both produce OperatorOutput with the same structure
    assert_eq!(output_a.exit_reason, ExitReason::Complete);
    assert_eq!(output_b.exit_reason, ExitReason::Complete);

    // But different content from different providers
    assert_eq!(output_a.message.as_text().unwrap(), "Hello from provider A");
    assert_eq!(output_b.message.as_text().unwrap(), "Hello from provider B");

    // Different token counts from different backends
    assert_eq!(output_a.metadata.tokens_in, 25);
    assert_eq!(output_b.metadata.tokens_in, 30);

    // Both implement the Operator trait and can be used as dyn Operator
    let dyn_a: Arc<dyn Operator> = Arc::new(make_react_operator(MockProvider::text("dyn A")));
    let dyn_b: Arc<dyn Operator> = Arc::new(ReactOperator::new(
        MockProviderB::text("dyn B"),
        ToolRegistry::new(),
        Box::new(SlidingWindow::new()),
        HookRegistry::new(),
        Arc::new(NullStateReader),
        react_config(),
    ));

    let out_a = dyn_a.execute(simple_input("test")).await.unwrap();
    let out_b = dyn_b.execute(simple_input("test")).await.unwrap();
    assert_eq!(out_a.exit_reason, ExitReason::Complete);
    assert_eq!(out_b.exit_reason, ExitReason::Complete);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pattern 2: Tiered memory management alongside request/response state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn memory_manager_is_independent_of_state_store() {
    // The key/value state store (turn config, scratch data) and the
    // tiered memory manager (remembered facts, scored and consolidated)
    // are separate abstractions that compose without knowing about
    // each other.
    let state = MemoryStore::new();
    let scope = Scope::Global;
    state
        .write(&scope, "last_model", serde_json::json!("mock-model"))
        .await
        .unwrap();

    let memory = MemoryManager::new(AgentId::new("assistant"), MemoryManagerConfig::default());
    memory
        .remember(
            serde_json::json!("the user prefers concise answers"),
            RememberOptions {
                importance: Some(0.8),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    memory
        .remember(
            serde_json::json!("said hello"),
            RememberOptions {
                importance: Some(0.1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let recalled = memory
        .recall("prefers", RecallOptions::default())
        .await
        .unwrap();
    assert!(recalled
        .iter()
        .any(|e| e.content == serde_json::json!("the user prefers concise answers")));

    let last_model = state.read(&scope, "last_model").await.unwrap();
    assert_eq!(last_model, Some(serde_json::json!("mock-model")));
}

#[tokio::test]
async fn memory_manager_consolidates_short_term_notes() {
    let memory = MemoryManager::new(AgentId::new("assistant"), MemoryManagerConfig::default());
    memory
        .remember(
            serde_json::json!("critical fact worth keeping forever"),
            RememberOptions {
                importance: Some(0.95),
                tier: Some(cortex_memory::MemoryTier::Short),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = memory.consolidate().await;
    assert_eq!(result.short_to_long, 1);

    let (short, _mid, long) = memory.stats().await;
    assert_eq!(short, 0);
    assert_eq!(long, 1);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pattern 3: Operator Swap
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn operator_swap_react_vs_echo() {
    let provider_response = ProviderResponse {
        content: vec![ContentPart::Text {
            text: "Hello, world!".to_string(),
        }],
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage {
            input_tokens: 20,
            output_tokens: 8,
            cache_read_tokens: None,
            cache_creation_tokens: None,
        },
        model: "mock-model".into(),
        cost: Some(Decimal::new(5, 5)), // $0.00005
        truncated: None,
    };

    // Operator A: ReactOperator (multi-turn with tools, hooks, state)
    let react_op = make_react_operator(MockProvider::new(provider_response));

    // Operator B: EchoOperator (no model call at all)
    let echo_op = EchoOperator;

    // Same input through both operators
    let input = simple_input("Say hello");

    let react_output = react_op.execute(input.clone()).await.unwrap();
    let echo_output = echo_op.execute(input).await.unwrap();

    // Both produce OperatorOutput with identical structure
    assert_eq!(react_output.exit_reason, ExitReason::Complete);
    assert_eq!(echo_output.exit_reason, ExitReason::Complete);

    assert_eq!(react_output.message.as_text().unwrap(), "Hello, world!");
    assert_eq!(echo_output.message.as_text().unwrap(), "Say hello");

    assert!(react_output.metadata.tokens_in > 0);
    assert_eq!(react_output.metadata.turns_used, 1); // also 1 when no tools used

    // Both can be used as dyn Operator (object-safe)
    let operators: Vec<Arc<dyn Operator>> = vec![
        Arc::new(make_react_operator(MockProvider::text("from react"))),
        Arc::new(EchoOperator),
    ];

    for (i, op) in operators.iter().enumerate() {
        let output = op.execute(simple_input("test")).await.unwrap();
        assert_eq!(
            output.exit_reason,
            ExitReason::Complete,
            "operator {i} should complete"
        );
        assert!(
            output.message.as_text().is_some(),
            "operator {i} should produce text"
        );
    }
}

#[tokio::test]
async fn operator_swap_echo_operator() {
    // EchoOperator from cortex-core's test-utils simply echoes back the input.
    // Proves that the Operator trait is simple enough for trivial impls.
    let echo: Arc<dyn Operator> = Arc::new(EchoOperator);

    let input = simple_input("This exact text should come back");
    let output = echo.execute(input).await.unwrap();

    assert_eq!(output.exit_reason, ExitReason::Complete);
    assert_eq!(
        output.message.as_text().unwrap(),
        "This exact text should come back"
    );
    assert_eq!(output.metadata.tokens_in, 0); // EchoOperator uses default metadata
    assert!(output.effects.is_empty());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pattern 4: Multi-Agent Orchestration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn multi_agent_dispatch_single() {
    let mut orch = LocalOrch::new();

    // Register agents with different capabilities
    let summarizer: Arc<dyn Operator> = Arc::new(make_react_operator(MockProvider::text(
        "Summary: the user greeted us.",
    )));
    let classifier: Arc<dyn Operator> =
        Arc::new(make_react_operator(MockProvider::text("category: greeting")));
    let echo: Arc<dyn Operator> = Arc::new(EchoOperator);

    orch.register(AgentId::new("summarizer"), summarizer);
    orch.register(AgentId::new("classifier"), classifier);
    orch.register(AgentId::new("echo"), echo);

    // Dispatch to individual agents
    let summary = orch
        .dispatch(&AgentId::new("summarizer"), simple_input("Hello there!"))
        .await
        .unwrap();
    assert_eq!(summary.exit_reason, ExitReason::Complete);
    assert_eq!(
        summary.message.as_text().unwrap(),
        "Summary: the user greeted us."
    );

    let classification = orch
        .dispatch(&AgentId::new("classifier"), simple_input("Hello there!"))
        .await
        .unwrap();
    assert_eq!(classification.exit_reason, ExitReason::Complete);
    assert_eq!(
        classification.message.as_text().unwrap(),
        "category: greeting"
    );

    let echoed = orch
        .dispatch(&AgentId::new("echo"), simple_input("Hello there!"))
        .await
        .unwrap();
    assert_eq!(echoed.message.as_text().unwrap(), "Hello there!");
}

#[tokio::test]
async fn multi_agent_parallel_dispatch() {
    let mut orch = LocalOrch::new();

    // Register multiple agents
    orch.register(
        AgentId::new("agent_a"),
        Arc::new(make_react_operator(MockProvider::text("Result from A"))),
    );
    orch.register(
        AgentId::new("agent_b"),
        Arc::new(make_react_operator(MockProvider::text("Result from B"))),
    );
    orch.register(AgentId::new("agent_c"), Arc::new(EchoOperator));

    // Parallel dispatch to all three
    let tasks = vec![
        (AgentId::new("agent_a"), simple_input("Task for A")),
        (AgentId::new("agent_b"), simple_input("Task for B")),
        (AgentId::new("agent_c"), simple_input("Task for C")),
    ];

    let results = orch.dispatch_many(tasks).await;

    // All three should succeed
    assert_eq!(results.len(), 3);
    for (i, result) in results.iter().enumerate() {
        assert!(result.is_ok(), "agent {i} should succeed");
    }

    let outputs: Vec<OperatorOutput> = results.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(outputs[0].message.as_text().unwrap(), "Result from A");
    assert_eq!(outputs[1].message.as_text().unwrap(), "Result from B");
    assert_eq!(outputs[2].message.as_text().unwrap(), "Task for C"); // echo
}

#[tokio::test]
async fn multi_agent_with_state_storage() {
    // Full workflow: orchestrate agents, collect results, store in state.
    let mut orch = LocalOrch::new();
    let state = MemoryStore::new();

    orch.register(
        AgentId::new("researcher"),
        Arc::new(make_react_operator(MockProvider::text(
            "Research findings: Rust is fast and safe.",
        ))),
    );
    orch.register(
        AgentId::new("writer"),
        Arc::new(make_react_operator(MockProvider::text(
            "Draft: Rust combines speed with memory safety.",
        ))),
    );

    // Step 1: Dispatch research task
    let research = orch
        .dispatch(
            &AgentId::new("researcher"),
            simple_input("Research Rust programming"),
        )
        .await
        .unwrap();

    // Step 2: Store research results
    let scope = Scope::Session(cortex_core::SessionId::new("workflow-1"));
    state
        .write(
            &scope,
            "research_result",
            serde_json::json!({
                "text": research.message.as_text().unwrap(),
                "tokens_used": research.metadata.tokens_in + research.metadata.tokens_out,
            }),
        )
        .await
        .unwrap();

    // Step 3: Dispatch writing task
    let draft = orch
        .dispatch(
            &AgentId::new("writer"),
            simple_input("Write about Rust based on research"),
        )
        .await
        .unwrap();

    // Step 4: Store draft
    state
        .write(
            &scope,
            "draft",
            serde_json::json!({
                "text": draft.message.as_text().unwrap(),
                "exit_reason": format!("{:?}", draft.exit_reason),
            }),
        )
        .await
        .unwrap();

    // Step 5: Verify state contains both results
    let stored_research = state
        .read(&scope, "research_result")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored_research["text"].as_str().unwrap(),
        "Research findings: Rust is fast and safe."
    );

    let stored_draft = state.read(&scope, "draft").await.unwrap().unwrap();
    assert_eq!(
        stored_draft["text"].as_str().unwrap(),
        "Draft: Rust combines speed with memory safety."
    );
    assert_eq!(stored_draft["exit_reason"].as_str().unwrap(), "Complete");

    // List all workflow artifacts
    let keys = state.list(&scope, "").await.unwrap();
    assert_eq!(keys.len(), 2);
}

#[tokio::test]
async fn multi_agent_missing_agent_handled_gracefully() {
    let mut orch = LocalOrch::new();
    orch.register(AgentId::new("echo"), Arc::new(EchoOperator));

    // Dispatch to a mix of existing and missing agents
    let tasks = vec![
        (AgentId::new("echo"), simple_input("exists")),
        (AgentId::new("nonexistent"), simple_input("missing")),
    ];

    let results = orch.dispatch_many(tasks).await;
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());

    // The error is an OrchError::AgentNotFound
    match results[1].as_ref().unwrap_err() {
        cortex_core::OrchError::AgentNotFound(name) => {
            assert_eq!(name, "nonexistent");
        }
        other => panic!("expected AgentNotFound, got {:?}", other),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Composition: combining patterns
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn combined_all_patterns() {
    // This test combines multiple patterns in a single workflow:
    // 1. Provider swap: two agents use different mock providers
    // 2. Tiered memory: the orchestrator's results feed a MemoryManager
    // 3. Orchestration: LocalOrch dispatches to both agents

    let mut orch = LocalOrch::new();

    // Agent 1: ReactOperator with MockProvider (provider A)
    let agent_a: Arc<dyn Operator> = Arc::new(make_react_operator(MockProvider::text(
        "Analysis: topic is interesting.",
    )));

    // Agent 2: ReactOperator with MockProviderB (provider B)
    let agent_b: Arc<dyn Operator> = Arc::new(ReactOperator::new(
        MockProviderB::text("Rating: 8/10"),
        ToolRegistry::new(),
        Box::new(SlidingWindow::new()),
        HookRegistry::new(),
        Arc::new(NullStateReader),
        react_config(),
    ));

    orch.register(AgentId::new("analyst"), agent_a);
    orch.register(AgentId::new("rater"), agent_b);

    // Parallel dispatch (orchestration pattern)
    let tasks = vec![
        (AgentId::new("analyst"), simple_input("Evaluate Rust")),
        (AgentId::new("rater"), simple_input("Evaluate Rust")),
    ];
    let results = orch.dispatch_many(tasks).await;

    let analysis = results[0].as_ref().unwrap();
    let rating = results[1].as_ref().unwrap();

    // Tiered memory: remember both results, scored by how much they
    // matter, then recall them back out.
    let memory = MemoryManager::new(AgentId::new("analyst"), MemoryManagerConfig::default());
    memory
        .remember(
            serde_json::json!(analysis.message.as_text().unwrap()),
            RememberOptions {
                importance: Some(0.3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    memory
        .remember(
            serde_json::json!(rating.message.as_text().unwrap()),
            RememberOptions {
                importance: Some(0.4),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Both entries landed in the short tier (importance below the mid
    // threshold), so `include_recent` surfaces both regardless of query.
    let recalled = memory
        .recall("Rust", RecallOptions::default())
        .await
        .unwrap();
    assert_eq!(recalled.len(), 2);
}
