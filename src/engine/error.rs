//! Executor error types

use serde_json::Value;

use crate::engine::credentials::CredentialError;
use crate::workflow::NodeKind;

/// Errors that abort a workflow execution
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("There is no trigger node")]
    NoTrigger,

    #[error("Unknown or unsupported node type: {0}")]
    UnsupportedNodeType(String),

    #[error(transparent)]
    ModelResolution(#[from] ModelResolutionError),

    #[error("Node '{node}' failed: {message}")]
    HandlerExecution {
        node: String,
        message: String,
        /// Data the handler returned alongside `success: false`
        data: Option<Value>,
        #[source]
        source: Option<HandlerError>,
    },

    #[error("{kind} node '{node}' supplies an agent and cannot be dispatched directly")]
    SubNodeDispatch { node: String, kind: NodeKind },
}

impl ExecutorError {
    /// Failure reported by a handler, either as `Err` or as `success: false`
    pub fn handler(node: &str, error: HandlerError) -> Self {
        ExecutorError::HandlerExecution {
            node: node.to_string(),
            message: error.to_string(),
            data: None,
            source: Some(error),
        }
    }

    pub fn handler_failed(node: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        ExecutorError::HandlerExecution {
            node: node.to_string(),
            message: message.into(),
            data,
            source: None,
        }
    }

    /// Handler data attached to the failure, if any
    pub fn data(&self) -> Option<&Value> {
        match self {
            ExecutorError::HandlerExecution { data, .. } => data.as_ref(),
            _ => None,
        }
    }
}

/// Why an agent could not get its model or tools
#[derive(Debug, thiserror::Error)]
pub enum ModelResolutionError {
    #[error("A Chat Model sub-node must be connected and enabled")]
    NoModelConnected,

    #[error("Agent can only have one model connected. Found {0} models.")]
    MultipleModelsConnected(usize),

    #[error("Unsupported model type: {0}")]
    UnsupportedModelType(String),

    #[error("Unsupported tool type: {0}")]
    UnsupportedToolType(String),

    #[error("Sub-node '{node}' failed to supply data: {source}")]
    SupplyFailure {
        node: String,
        #[source]
        source: HandlerError,
    },
}

/// Errors raised inside node handlers
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("{0}")]
    Failed(String),
}

/// Render an error and its sources, one per line
pub fn error_stack(err: &(dyn std::error::Error + 'static)) -> String {
    let mut lines = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {}", cause));
        source = cause.source();
    }
    lines.join("\n")
}
