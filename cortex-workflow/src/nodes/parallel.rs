//! Parallel node: static branches or a dynamic `forEach` over a list,
//! run concurrently and reduced by a merge function.

use crate::context::WorkflowContext;
use crate::error::NodeError;
use crate::node::WorkflowNode;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// How a [`ParallelNode`] run reacts to a branch failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Any branch failure fails the whole node.
    All,
    /// Failed branches are dropped; only successes are merged.
    Partial,
    /// Best-effort: every branch's outcome (success or error text) is merged.
    None,
}

/// One branch: an async function over the node's input and context.
pub type BranchFn = Arc<
    dyn Fn(Value, WorkflowContext) -> BoxFuture<'static, Result<Value, NodeError>> + Send + Sync,
>;

/// Reduces the branch results into the node's single output.
pub type MergeFn = Arc<dyn Fn(Vec<BranchResult>) -> Value + Send + Sync>;

/// One branch's outcome, as seen by a [`MergeFn`].
#[derive(Debug, Clone)]
pub struct BranchResult {
    /// The branch's index (static branches) or item index (`forEach`).
    pub index: usize,
    /// `Ok` on success, `Err` with the failure message otherwise.
    pub outcome: Result<Value, String>,
}

enum Branches {
    Static(Vec<BranchFn>),
    ForEach { items_key: Option<String>, branch: BranchFn },
}

/// A node that fans input out over branches, runs them concurrently
/// (bounded by `max_concurrency`), and merges the results.
pub struct ParallelNode {
    name: String,
    branches: Branches,
    max_concurrency: usize,
    failure_policy: FailurePolicy,
    merge: MergeFn,
}

fn default_merge() -> MergeFn {
    Arc::new(|results| {
        Value::Array(
            results
                .into_iter()
                .map(|r| match r.outcome {
                    Ok(v) => v,
                    Err(e) => serde_json::json!({"error": e}),
                })
                .collect(),
        )
    })
}

impl ParallelNode {
    /// A node with a fixed list of branches, each run against the same
    /// input.
    pub fn static_branches(name: impl Into<String>, branches: Vec<BranchFn>) -> Self {
        ParallelNode {
            name: name.into(),
            branches: Branches::Static(branches),
            max_concurrency: usize::MAX,
            failure_policy: FailurePolicy::All,
            merge: default_merge(),
        }
    }

    /// A node that runs `branch` once per element of the input array (or
    /// of `input[items_key]` when `items_key` is set).
    pub fn for_each(name: impl Into<String>, branch: BranchFn) -> Self {
        ParallelNode {
            name: name.into(),
            branches: Branches::ForEach {
                items_key: None,
                branch,
            },
            max_concurrency: usize::MAX,
            failure_policy: FailurePolicy::All,
            merge: default_merge(),
        }
    }

    /// Reads the iterated items from `input[key]` instead of the whole input.
    pub fn with_items_key(mut self, key: impl Into<String>) -> Self {
        if let Branches::ForEach { items_key, .. } = &mut self.branches {
            *items_key = Some(key.into());
        }
        self
    }

    /// Caps how many branches run concurrently.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Sets how a branch failure affects the overall result.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Overrides the default (collect-into-array) merge function.
    pub fn with_merge(mut self, merge: MergeFn) -> Self {
        self.merge = merge;
        self
    }
}

#[async_trait]
impl WorkflowNode for ParallelNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: Value, ctx: &WorkflowContext) -> Result<Value, NodeError> {
        let tasks: Vec<(usize, Value, BranchFn)> = match &self.branches {
            Branches::Static(branches) => branches
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, b)| (i, input.clone(), b))
                .collect(),
            Branches::ForEach { items_key, branch } => {
                let items = match items_key {
                    Some(key) => input.get(key).cloned().unwrap_or(Value::Null),
                    None => input.clone(),
                };
                let items = items.as_array().cloned().ok_or_else(|| {
                    NodeError::new("forEach input is not a JSON array".to_string())
                })?;
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (i, item, branch.clone()))
                    .collect()
            }
        };

        let mut results: Vec<BranchResult> = Vec::with_capacity(tasks.len());
        for chunk in tasks.chunks(self.max_concurrency) {
            let mut set = tokio::task::JoinSet::new();
            for (index, item, branch) in chunk.iter().cloned() {
                let ctx = ctx.clone();
                set.spawn(async move {
                    let outcome = branch(item, ctx).await.map_err(|e| e.0);
                    BranchResult { index, outcome }
                });
            }
            while let Some(joined) = set.join_next().await {
                let result = joined.map_err(|e| NodeError::new(e.to_string()))?;
                if self.failure_policy == FailurePolicy::All {
                    if let Err(msg) = &result.outcome {
                        return Err(NodeError::new(msg.clone()));
                    }
                }
                results.push(result);
            }
        }
        results.sort_by_key(|r| r.index);

        if self.failure_policy == FailurePolicy::Partial {
            results.retain(|r| r.outcome.is_ok());
        }

        Ok((self.merge)(results))
    }
}
