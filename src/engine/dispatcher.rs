//! Node dispatch - routes a node to the handler registered for its kind and name

use serde_json::{Map, Value};
use tracing::debug;

use crate::engine::contracts::{AgentArgs, NodeArgs};
use crate::engine::error::ExecutorError;
use crate::engine::model_resolver::{ModelResolver, ResolvedSubNodes};
use crate::engine::registry::NodeRegistry;
use crate::engine::result::NodeOutcome;
use crate::workflow::{ExecutionContext, Node, NodeKind, OutputStore};

/// Result of dispatching one node
pub struct DispatchOutcome {
    /// Handler data; `Null` when the handler returned none
    pub data: Value,
    /// Set for agents only
    pub sub_nodes: Option<ResolvedSubNodes>,
}

pub struct NodeDispatcher<'a> {
    registry: &'a NodeRegistry,
}

impl<'a> NodeDispatcher<'a> {
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self { registry }
    }

    pub async fn dispatch(
        &self,
        node: &Node,
        parameters: Map<String, Value>,
        ctx: &mut ExecutionContext,
        outputs: &OutputStore,
    ) -> Result<DispatchOutcome, ExecutorError> {
        debug!(node = %node.id, kind = %node.kind, name = %node.name, "Dispatching node");

        match node.kind {
            NodeKind::Trigger => {
                let handler = self
                    .registry
                    .trigger(&node.name)
                    .ok_or_else(|| ExecutorError::UnsupportedNodeType(node.name.clone()))?;
                let outcome = handler
                    .execute(NodeArgs {
                        parameters,
                        credential_id: node.credential_id.clone(),
                        input: ctx.trigger_data.clone(),
                    })
                    .await
                    .map_err(|e| ExecutorError::handler(&node.name, e))?;
                Ok(DispatchOutcome {
                    data: Self::accept(node, outcome)?,
                    sub_nodes: None,
                })
            }
            NodeKind::Action => {
                let handler = self
                    .registry
                    .action(&node.name)
                    .ok_or_else(|| ExecutorError::UnsupportedNodeType(node.name.clone()))?;
                let outcome = handler
                    .execute(NodeArgs {
                        parameters,
                        credential_id: node.credential_id.clone(),
                        input: None,
                    })
                    .await
                    .map_err(|e| ExecutorError::handler(&node.name, e))?;
                Ok(DispatchOutcome {
                    data: Self::accept(node, outcome)?,
                    sub_nodes: None,
                })
            }
            NodeKind::Agent => {
                // An unknown agent fails before its sub-nodes are touched
                let handler = self
                    .registry
                    .agent(&node.name)
                    .ok_or_else(|| ExecutorError::UnsupportedNodeType(node.name.clone()))?;
                let resolved = ModelResolver::new(self.registry)
                    .resolve(node, ctx, outputs)
                    .await?;
                let outcome = handler
                    .execute(AgentArgs {
                        parameters,
                        credential_id: node.credential_id.clone(),
                        model: resolved.model.clone(),
                        tools: resolved.tools.clone(),
                    })
                    .await
                    .map_err(|e| ExecutorError::handler(&node.name, e))?;
                Ok(DispatchOutcome {
                    data: Self::accept(node, outcome)?,
                    sub_nodes: Some(resolved),
                })
            }
            NodeKind::Model | NodeKind::Tool => Err(ExecutorError::SubNodeDispatch {
                node: node.id.clone(),
                kind: node.kind,
            }),
        }
    }

    fn accept(node: &Node, outcome: NodeOutcome) -> Result<Value, ExecutorError> {
        if outcome.success {
            Ok(outcome.data.unwrap_or(Value::Null))
        } else {
            Err(ExecutorError::handler_failed(
                &node.name,
                outcome
                    .error
                    .unwrap_or_else(|| "Node execution failed".to_string()),
                outcome.data,
            ))
        }
    }
}
