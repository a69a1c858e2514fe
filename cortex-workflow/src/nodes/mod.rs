//! Built-in node types: LLM, tool, condition, parallel, custom.

pub mod condition;
pub mod custom;
pub mod llm;
pub mod parallel;
pub mod tool;

pub use condition::{when_false, when_true, ConditionNode, PredicateFn};
pub use custom::{CustomFn, CustomNode};
pub use llm::{erase_provider, erase_provider_chat, BoxedChat, BoxedComplete, LlmNode, MessagesFn};
pub use parallel::{BranchFn, BranchResult, FailurePolicy, MergeFn, ParallelNode};
pub use tool::{ProjectFn, ToolNode, TransformFn};
