//! Execution result types

use serde_json::Value;

/// What a handler returns from `execute`
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutcome {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl NodeOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl Default for NodeOutcome {
    fn default() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

/// Result of a completed execution
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub execution_id: String,
    pub workflow_id: String,
    /// `{ nodeId: { nodeName, json } }`
    pub outputs: Value,
    /// Node ids in the order they were visited
    pub visited: Vec<String>,
}
