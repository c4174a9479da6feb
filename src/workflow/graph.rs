//! Node, Edge, and WorkflowJob definitions
//!
//! These are the wire types delivered by the job queue. A job carries the
//! materialized graph of one workflow: a flat node list plus the edges that
//! connect them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::context::ExecutionContext;

/// Edge handles that attach a chat model to an agent
pub const MODEL_HANDLES: &[&str] = &["chat-model", "model", "ai_languageModel"];

/// Edge handles that attach a tool to an agent
pub const TOOL_HANDLES: &[&str] = &["tool", "tools", "ai_tool"];

// ============================================================================
// Node
// ============================================================================

/// The closed set of node kinds the engine knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Graph entry point
    Trigger,
    /// Ordinary step in the main flow
    Action,
    /// Step that needs a connected model (and optional tools) to run
    Agent,
    /// Supplies a chat model to an agent
    Model,
    /// Supplies a tool definition to an agent
    Tool,
}

impl NodeKind {
    /// Model and tool nodes feed an agent instead of running on their own
    pub fn is_sub_node(&self) -> bool {
        matches!(self, NodeKind::Model | NodeKind::Tool)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Action => "action",
            NodeKind::Agent => "agent",
            NodeKind::Model => "model",
            NodeKind::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// A single node of a workflow graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique within one graph
    pub id: String,

    /// What role the node plays in the graph
    pub kind: NodeKind,

    /// Selects the concrete handler for this kind
    pub name: String,

    /// Handler parameters, may contain `{{ }}` expressions
    #[serde(default)]
    pub parameters: Map<String, Value>,

    /// Credential the handler should look up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,

    /// Editor-only data, carried through untouched
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub ui_data: Value,

    /// Disabled sub-nodes are ignored when an agent looks for its model/tools
    #[serde(default)]
    pub disabled: bool,
}

impl Node {
    /// Create a node with no parameters
    pub fn new(id: impl Into<String>, kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            parameters: Map::new(),
            credential_id: None,
            ui_data: Value::Null,
            disabled: false,
        }
    }

    /// Builder-style parameter setter
    pub fn with_parameter(mut self, key: &str, value: Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    /// Builder-style credential setter
    pub fn with_credential(mut self, credential_id: impl Into<String>) -> Self {
        self.credential_id = Some(credential_id.into());
        self
    }
}

// ============================================================================
// Edge
// ============================================================================

/// A directed connection between two nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,

    /// Which output of `source` this edge leaves from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    pub fn is_model_handle(&self) -> bool {
        self.source_handle
            .as_deref()
            .is_some_and(|h| MODEL_HANDLES.contains(&h))
    }

    pub fn is_tool_handle(&self) -> bool {
        self.source_handle
            .as_deref()
            .is_some_and(|h| TOOL_HANDLES.contains(&h))
    }
}

// ============================================================================
// WorkflowJob
// ============================================================================

/// One unit of work pulled off the job queue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowJob {
    pub workflow_id: String,

    /// Pre-assigned execution id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,

    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,

    /// Payload handed to the trigger node (e.g. a webhook body)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_data: Option<Value>,
}

impl WorkflowJob {
    pub fn new(workflow_id: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            execution_id: None,
            nodes,
            edges,
            trigger_data: None,
        }
    }

    /// Build the per-run context for this job
    pub fn into_context(self) -> ExecutionContext {
        let mut ctx = match self.execution_id {
            Some(id) => {
                ExecutionContext::with_execution_id(self.workflow_id, id, self.nodes, self.edges)
            }
            None => ExecutionContext::new(self.workflow_id, self.nodes, self.edges),
        };
        ctx.trigger_data = self.trigger_data;
        ctx
    }
}
