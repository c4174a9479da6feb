//! Graph Executor - Walks a workflow graph and drives its nodes
//!
//! For each run the executor:
//! 1. Reports `Running` to the status sink
//! 2. Finds the trigger node
//! 3. Walks the graph depth-first from the trigger, one node at a time
//! 4. Resolves `{{ }}` expressions and dispatches each node to its handler
//! 5. Records node outputs and publishes progress events
//! 6. Stops at the first failing node
//!
//! Every run ends with exactly one terminal event (`Success` or `Failed`)
//! and one finished status update.

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::dispatcher::NodeDispatcher;
use crate::engine::error::{error_stack, ExecutorError};
use crate::engine::events::{EventPublisher, EventRelay, ExecutionEvent, PublishStats};
use crate::engine::registry::NodeRegistry;
use crate::engine::result::ExecutionReport;
use crate::engine::status::{ExecutionStatus, StatusSink};
use crate::workflow::{ExecutionContext, ExpressionResolver, Node, NodeKind, OutputStore, WorkflowJob};

const SKIPPED_SUB_NODE_MESSAGE: &str = "Sub-node is executed through its agent";

/// Sequential graph executor
///
/// One executor can serve any number of runs; nothing run-specific is kept on
/// it. Workers share it behind an `Arc`.
pub struct GraphExecutor {
    registry: Arc<NodeRegistry>,
    events: EventRelay,
    status: Arc<dyn StatusSink>,
}

impl GraphExecutor {
    pub fn new(
        registry: Arc<NodeRegistry>,
        publisher: Arc<dyn EventPublisher>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            registry,
            events: EventRelay::new(publisher),
            status,
        }
    }

    /// Counters of published and dropped events
    pub fn publish_stats(&self) -> Arc<PublishStats> {
        self.events.stats()
    }

    /// Run a job pulled off the queue
    #[instrument(skip(self, job), fields(workflow_id = %job.workflow_id))]
    pub async fn run_job(&self, job: WorkflowJob) -> Result<ExecutionReport, ExecutorError> {
        self.run(job.into_context()).await
    }

    /// Execute one workflow graph to completion or first failure
    #[instrument(skip(self, ctx), fields(workflow_id = %ctx.workflow_id, execution_id = %ctx.execution_id))]
    pub async fn run(&self, mut ctx: ExecutionContext) -> Result<ExecutionReport, ExecutorError> {
        let execution_id = ctx.execution_id.clone();
        let workflow_id = ctx.workflow_id.clone();

        info!("Starting execution ({} nodes, {} edges)", ctx.nodes().len(), ctx.edges().len());
        self.report_status(&execution_id, ExecutionStatus::Running, false)
            .await;

        let Some(trigger_id) = ctx.find_trigger().map(|t| t.id.clone()) else {
            let err = ExecutorError::NoTrigger;
            error!("Execution failed: {}", err);
            self.report_status(&execution_id, ExecutionStatus::Error, true)
                .await;
            self.events.emit(
                &execution_id,
                ExecutionEvent::run_failed(&execution_id, &workflow_id, err.to_string()),
            );
            return Err(err);
        };

        let dispatcher = NodeDispatcher::new(&self.registry);
        let mut outputs = OutputStore::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut visited: Vec<String> = Vec::new();
        let mut stack = vec![trigger_id];

        while let Some(node_id) = stack.pop() {
            if ctx.is_excluded(&node_id) {
                debug!(node = %node_id, "Skipping node resolved by its agent");
                continue;
            }

            let Some(node) = ctx.node(&node_id).cloned() else {
                warn!(node = %node_id, "Edge points at a missing node; ending branch");
                continue;
            };

            if !seen.insert(node_id.clone()) {
                debug!(node = %node_id, "Node already executed");
                continue;
            }
            visited.push(node_id);

            self.events.emit(
                &execution_id,
                ExecutionEvent::node_executing(&execution_id, &workflow_id, &node.id, &node.name),
            );

            if node.kind.is_sub_node() {
                info!(node = %node.id, kind = %node.kind, "Skipping sub-node reached in main flow");
                self.events.emit(
                    &execution_id,
                    ExecutionEvent::node_skipped(
                        &execution_id,
                        &workflow_id,
                        &node.id,
                        &node.name,
                        SKIPPED_SUB_NODE_MESSAGE,
                    ),
                );
                push_children(&ctx, &node, &mut stack);
                continue;
            }

            let parameters = ExpressionResolver::new(&outputs).resolve_parameters(&node.parameters);

            info!(node = %node.id, name = %node.name, "Executing node");
            let dispatched = dispatcher
                .dispatch(&node, parameters, &mut ctx, &outputs)
                .await;
            let outcome = match dispatched {
                Ok(outcome) => outcome,
                Err(err) => return Err(self.abort(&ctx, &node, err, &outputs).await),
            };

            if let Some(sub_nodes) = &outcome.sub_nodes {
                self.events.emit(
                    &execution_id,
                    ExecutionEvent::node_success(
                        &execution_id,
                        &workflow_id,
                        &sub_nodes.model_node_id,
                        &sub_nodes.model_node_name,
                        sub_nodes.response.clone(),
                    ),
                );
            }

            // Triggers without a payload leave nothing to reference
            if node.kind != NodeKind::Trigger || !outcome.data.is_null() {
                outputs.put(&node.id, &node.name, outcome.data.clone());
            }

            self.events.emit(
                &execution_id,
                ExecutionEvent::node_success(&execution_id, &workflow_id, &node.id, &node.name, outcome.data),
            );

            push_children(&ctx, &node, &mut stack);
        }

        info!("Execution finished ({} nodes visited)", visited.len());
        self.report_status(&execution_id, ExecutionStatus::Success, true)
            .await;

        let snapshot = outputs.snapshot();
        self.events.emit(
            &execution_id,
            ExecutionEvent::run_succeeded(&execution_id, &workflow_id, snapshot.clone()),
        );

        Ok(ExecutionReport {
            execution_id,
            workflow_id,
            outputs: snapshot,
            visited,
        })
    }

    /// Publish the terminal failure for a node and mark the run as errored
    async fn abort(
        &self,
        ctx: &ExecutionContext,
        node: &Node,
        err: ExecutorError,
        outputs: &OutputStore,
    ) -> ExecutorError {
        let message = err.to_string();
        error!(node = %node.id, "Node failed: {}", message);

        let mut response = json!({ "error": message, "stack": error_stack(&err) });
        if let Some(data) = err.data() {
            response["data"] = data.clone();
        }

        self.events.emit(
            &ctx.execution_id,
            ExecutionEvent::node_failed(
                &ctx.execution_id,
                &ctx.workflow_id,
                &node.id,
                &node.name,
                message.clone(),
                response,
                outputs.snapshot(),
            ),
        );
        self.report_status(&ctx.execution_id, ExecutionStatus::Error, true)
            .await;

        err
    }

    async fn report_status(&self, execution_id: &str, status: ExecutionStatus, finished: bool) {
        if let Err(e) = self
            .status
            .update_status(execution_id, status, finished)
            .await
        {
            warn!(status = ?status, error = %e, "Failed to update execution status");
        }
    }
}

/// Push a node's children so they pop in edge-list order
fn push_children(ctx: &ExecutionContext, node: &Node, stack: &mut Vec<String>) {
    let children: Vec<String> = ctx.outgoing(&node.id).map(|e| e.target.clone()).collect();
    stack.extend(children.into_iter().rev());
}
