//! Model resolution for agent nodes
//!
//! An agent cannot run on its own: it needs exactly one enabled model sub-node
//! and may have any number of tool sub-nodes. The resolver supplies both and
//! marks them excluded so the main traversal never dispatches them.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::engine::contracts::{ChatModel, SupplyArgs, ToolDefinition};
use crate::engine::error::ModelResolutionError;
use crate::engine::registry::NodeRegistry;
use crate::workflow::{ExecutionContext, ExpressionResolver, Node, OutputStore};

/// Everything an agent needs from its sub-nodes
pub struct ResolvedSubNodes {
    pub model: Arc<dyn ChatModel>,
    pub model_node_id: String,
    pub model_node_name: String,
    /// Data reported in the model node's success event
    pub response: Value,
    pub tools: Vec<ToolDefinition>,
}

pub struct ModelResolver<'a> {
    registry: &'a NodeRegistry,
}

impl<'a> ModelResolver<'a> {
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self { registry }
    }

    pub async fn resolve(
        &self,
        agent: &Node,
        ctx: &mut ExecutionContext,
        outputs: &OutputStore,
    ) -> Result<ResolvedSubNodes, ModelResolutionError> {
        let expressions = ExpressionResolver::new(outputs);

        // Clone what we need so the borrow on ctx ends before exclusion
        let (model_node, tool_nodes) = {
            let sub_nodes = ctx.sub_nodes(&agent.id);
            let model_node = match sub_nodes.models.as_slice() {
                [] => return Err(ModelResolutionError::NoModelConnected),
                [only] => (*only).clone(),
                many => return Err(ModelResolutionError::MultipleModelsConnected(many.len())),
            };
            let tool_nodes: Vec<Node> = sub_nodes.tools.into_iter().cloned().collect();
            (model_node, tool_nodes)
        };

        let provider = self
            .registry
            .model(&model_node.name)
            .ok_or_else(|| ModelResolutionError::UnsupportedModelType(model_node.name.clone()))?;

        debug!(agent = %agent.id, model = %model_node.id, "Supplying model");
        let supplied = provider
            .supply_data(SupplyArgs {
                parameters: expressions.resolve_parameters(&model_node.parameters),
                credential_id: model_node.credential_id.clone(),
            })
            .await
            .map_err(|source| ModelResolutionError::SupplyFailure {
                node: model_node.name.clone(),
                source,
            })?;

        let mut tools = Vec::with_capacity(tool_nodes.len());
        let mut tool_node_ids = Vec::with_capacity(tool_nodes.len());
        for tool_node in &tool_nodes {
            let provider = self
                .registry
                .tool(&tool_node.name)
                .ok_or_else(|| ModelResolutionError::UnsupportedToolType(tool_node.name.clone()))?;
            let definition = provider
                .supply_tool(expressions.resolve_parameters(&tool_node.parameters))
                .await
                .map_err(|source| ModelResolutionError::SupplyFailure {
                    node: tool_node.name.clone(),
                    source,
                })?;
            tools.push(definition);
            tool_node_ids.push(tool_node.id.clone());
        }

        ctx.exclude(&model_node.id);
        for id in &tool_node_ids {
            ctx.exclude(id);
        }

        info!(
            agent = %agent.id,
            model = %model_node.id,
            tools = tool_node_ids.len(),
            "Resolved agent sub-nodes"
        );

        Ok(ResolvedSubNodes {
            model: supplied.model,
            model_node_id: model_node.id,
            model_node_name: model_node.name,
            response: supplied.response,
            tools,
        })
    }
}
