//! Handler contracts
//!
//! Each node kind has its own contract:
//! - triggers and actions implement [`NodeHandler`]
//! - agents implement [`AgentHandler`] and receive a resolved model and tools
//! - model sub-nodes implement [`ModelProvider`]
//! - tool sub-nodes implement [`ToolProvider`]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::engine::error::HandlerError;
use crate::engine::result::NodeOutcome;

/// Arguments for trigger and action handlers
#[derive(Debug, Clone, Default)]
pub struct NodeArgs {
    /// Parameters with expressions already resolved
    pub parameters: Map<String, Value>,
    pub credential_id: Option<String>,
    /// Trigger payload; `None` for non-trigger nodes
    pub input: Option<Value>,
}

#[async_trait]
pub trait NodeHandler: Send + Sync {
    fn description(&self) -> &str;

    async fn execute(&self, args: NodeArgs) -> Result<NodeOutcome, HandlerError>;
}

/// Arguments for agent handlers
pub struct AgentArgs {
    pub parameters: Map<String, Value>,
    pub credential_id: Option<String>,
    pub model: Arc<dyn ChatModel>,
    pub tools: Vec<ToolDefinition>,
}

#[async_trait]
pub trait AgentHandler: Send + Sync {
    fn description(&self) -> &str;

    async fn execute(&self, args: AgentArgs) -> Result<NodeOutcome, HandlerError>;
}

// ============================================================================
// Models
// ============================================================================

/// A single chat turn sent to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub system: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// Handle to a configured chat model
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, HandlerError>;
}

/// Arguments for supplying a model
#[derive(Debug, Clone, Default)]
pub struct SupplyArgs {
    pub parameters: Map<String, Value>,
    pub credential_id: Option<String>,
}

/// A model handle plus the data reported in the model node's success event
pub struct SuppliedModel {
    pub model: Arc<dyn ChatModel>,
    pub response: Value,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn description(&self) -> &str;

    async fn supply_data(&self, args: SupplyArgs) -> Result<SuppliedModel, HandlerError>;
}

// ============================================================================
// Tools
// ============================================================================

/// Tool offered to the model, in function-calling form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool arguments
    pub parameters: Value,
}

#[async_trait]
pub trait ToolProvider: Send + Sync {
    fn description(&self) -> &str;

    async fn supply_tool(&self, parameters: Map<String, Value>) -> Result<ToolDefinition, HandlerError>;
}
