//! Breadth-wise wavefront execution over a [`CompiledWorkflow`].

use crate::context::WorkflowContext;
use crate::error::{NodeExecutionError, WorkflowError};
use crate::event::WorkflowEvent;
use crate::graph::CompiledWorkflow;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Options governing one run of a [`CompiledWorkflow`].
#[derive(Clone)]
pub struct ExecuteOptions {
    /// Wall-clock budget for the whole run, checked once per wave.
    pub timeout: Option<Duration>,
    /// Cooperative cancellation, checked once per wave.
    pub abort: CancellationToken,
    /// Overrides the graph's compiled `max_iterations` for this run.
    pub max_iterations: Option<usize>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        ExecuteOptions {
            timeout: None,
            abort: CancellationToken::new(),
            max_iterations: None,
        }
    }
}

/// The result of a completed run.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    /// The last-finished node's output.
    pub output: Value,
    /// Node names in completion order.
    pub execution_path: Vec<String>,
    /// Every node's output, keyed by node name.
    pub node_outputs: HashMap<String, Value>,
}

struct WaveState {
    ctx: WorkflowContext,
    current_output: Value,
    active: Vec<String>,
    waves: usize,
}

impl WaveState {
    fn new(start_node: &str, input: Value) -> Self {
        WaveState {
            ctx: WorkflowContext::new(),
            current_output: input,
            active: vec![start_node.to_string()],
            waves: 0,
        }
    }
}

fn check_deadline(
    opts: &ExecuteOptions,
    start_time: Instant,
) -> Result<(), WorkflowError> {
    if opts.abort.is_cancelled() {
        return Err(WorkflowError::Aborted);
    }
    if let Some(timeout) = opts.timeout {
        if start_time.elapsed() >= timeout {
            return Err(WorkflowError::TimedOut);
        }
    }
    Ok(())
}

/// Run the workflow to completion and return its final output.
pub async fn invoke(
    workflow: &CompiledWorkflow,
    input: Value,
    opts: &ExecuteOptions,
) -> Result<WorkflowOutcome, WorkflowError> {
    let start_time = Instant::now();
    let max_iterations = opts.max_iterations.unwrap_or(workflow.max_iterations);
    let mut state = WaveState::new(workflow.start_node(), input);

    loop {
        check_deadline(opts, start_time)?;
        if state.active.is_empty() {
            break;
        }
        state.waves += 1;
        if state.waves > max_iterations {
            return Err(WorkflowError::MaxIterationsExceeded(max_iterations));
        }

        let finished = run_wave(workflow, &mut state).await?;
        let mut next_active = Vec::new();
        let mut seen = HashSet::new();
        for name in &finished {
            for succ in workflow.successors(name, &state.ctx).await {
                if seen.insert(succ.clone()) {
                    next_active.push(succ);
                }
            }
        }
        state.active = next_active;
    }

    Ok(WorkflowOutcome {
        output: state.current_output,
        execution_path: state.ctx.execution_path,
        node_outputs: state.ctx.node_outputs,
    })
}

async fn run_wave(
    workflow: &CompiledWorkflow,
    state: &mut WaveState,
) -> Result<Vec<String>, WorkflowError> {
    let mut joins: JoinSet<(String, Result<Value, crate::error::NodeError>)> = JoinSet::new();
    for name in &state.active {
        let node = workflow.nodes[name].clone();
        let node_input = state
            .ctx
            .input_override(name)
            .cloned()
            .unwrap_or_else(|| state.current_output.clone());
        let node_ctx = state.ctx.snapshot_for(name);
        let name = name.clone();
        joins.spawn(async move {
            let result = node.execute(node_input, &node_ctx).await;
            (name, result)
        });
    }

    let mut finished = Vec::new();
    while let Some(joined) = joins.join_next().await {
        let (name, result) = joined.map_err(|e| {
            WorkflowError::NodeFailed(NodeExecutionError::new(
                "<unknown>",
                crate::error::NodeError::new(format!("node task panicked: {e}")),
            ))
        })?;
        match result {
            Ok(output) => {
                state.ctx.node_outputs.insert(name.clone(), output.clone());
                state.ctx.execution_path.push(name.clone());
                state.current_output = output;
                finished.push(name);
            }
            Err(source) => {
                return Err(WorkflowError::NodeFailed(NodeExecutionError::new(
                    name, source,
                )));
            }
        }
    }
    Ok(finished)
}

/// Run the workflow, yielding a [`WorkflowEvent`] per lifecycle
/// transition instead of only the final outcome. Event production is
/// decoupled from consumption by a single-slot channel: a consumer that
/// isn't draining it applies backpressure to the executor, pausing the
/// next wave rather than buffering unboundedly.
pub fn execute_streaming(
    workflow: std::sync::Arc<CompiledWorkflow>,
    input: Value,
    opts: ExecuteOptions,
) -> ReceiverStream<WorkflowEvent> {
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let start_node = workflow.start_node().to_string();
        if tx
            .send(WorkflowEvent::WorkflowStart {
                start_node: start_node.clone(),
            })
            .await
            .is_err()
        {
            return;
        }

        // Nodes that stream their own output (an `LlmNode` built with
        // `with_streaming`) send `LlmToken` events here rather than
        // blocking on the bounded `tx` used for wave-boundary events.
        let (token_tx, mut token_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
        let forward_tx = tx.clone();
        tokio::spawn(async move {
            while let Some(event) = token_rx.recv().await {
                if forward_tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        let start_time = Instant::now();
        let max_iterations = opts.max_iterations.unwrap_or(workflow.max_iterations);
        let mut state = WaveState::new(&start_node, input);
        state.ctx.token_sink = Some(token_tx);

        loop {
            if let Err(e) = check_deadline(&opts, start_time) {
                let _ = tx
                    .send(WorkflowEvent::WorkflowError {
                        message: e.to_string(),
                    })
                    .await;
                return;
            }
            if state.active.is_empty() {
                break;
            }
            state.waves += 1;
            if state.waves > max_iterations {
                let _ = tx
                    .send(WorkflowEvent::WorkflowError {
                        message: WorkflowError::MaxIterationsExceeded(max_iterations).to_string(),
                    })
                    .await;
                return;
            }

            for name in &state.active {
                let _ = tx
                    .send(WorkflowEvent::NodeStart {
                        node_name: name.clone(),
                    })
                    .await;
            }

            let wave_result = run_wave_reporting(&workflow, &mut state, &tx).await;
            let finished = match wave_result {
                Ok(finished) => finished,
                Err(e) => {
                    let _ = tx
                        .send(WorkflowEvent::WorkflowError {
                            message: e.to_string(),
                        })
                        .await;
                    return;
                }
            };

            let mut next_active = Vec::new();
            let mut seen = HashSet::new();
            for name in &finished {
                for succ in workflow.successors(name, &state.ctx).await {
                    if seen.insert(succ.clone()) {
                        next_active.push(succ);
                    }
                }
            }
            state.active = next_active;
        }

        let _ = tx
            .send(WorkflowEvent::WorkflowComplete {
                output: state.current_output,
                execution_path: state.ctx.execution_path,
            })
            .await;
    });

    ReceiverStream::new(rx)
}

async fn run_wave_reporting(
    workflow: &CompiledWorkflow,
    state: &mut WaveState,
    tx: &mpsc::Sender<WorkflowEvent>,
) -> Result<Vec<String>, WorkflowError> {
    let mut joins: JoinSet<(String, Result<Value, crate::error::NodeError>)> = JoinSet::new();
    for name in &state.active {
        let node = workflow.nodes[name].clone();
        let node_input = state
            .ctx
            .input_override(name)
            .cloned()
            .unwrap_or_else(|| state.current_output.clone());
        let node_ctx = state.ctx.snapshot_for(name);
        let name = name.clone();
        joins.spawn(async move {
            let result = node.execute(node_input, &node_ctx).await;
            (name, result)
        });
    }

    let mut finished = Vec::new();
    while let Some(joined) = joins.join_next().await {
        let (name, result) = joined.map_err(|e| {
            WorkflowError::NodeFailed(NodeExecutionError::new(
                "<unknown>",
                crate::error::NodeError::new(format!("node task panicked: {e}")),
            ))
        })?;
        match result {
            Ok(output) => {
                state.ctx.node_outputs.insert(name.clone(), output.clone());
                state.ctx.execution_path.push(name.clone());
                state.current_output = output.clone();
                let _ = tx
                    .send(WorkflowEvent::NodeComplete {
                        node_name: name.clone(),
                        output,
                    })
                    .await;
                finished.push(name);
            }
            Err(source) => {
                let _ = tx
                    .send(WorkflowEvent::NodeError {
                        node_name: name.clone(),
                        message: source.to_string(),
                    })
                    .await;
                return Err(WorkflowError::NodeFailed(NodeExecutionError::new(
                    name, source,
                )));
            }
        }
    }
    Ok(finished)
}
