//! Progress events
//!
//! The executor emits one event per node state change plus one terminal event
//! per run. Publishing never blocks and never fails a run: a rejected event is
//! logged and counted on [`PublishStats`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Run-level status carried by every event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

/// Node-level status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Executing,
    Success,
    Failed,
    Skipped,
}

/// Wire shape of a progress event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    pub execution_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_status: Option<NodeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
}

impl ExecutionEvent {
    fn base(execution_id: &str, workflow_id: &str, status: RunStatus) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            workflow_id: Some(workflow_id.to_string()),
            node_id: None,
            node_name: None,
            status,
            message: None,
            node_status: None,
            response: None,
            json: None,
        }
    }

    fn for_node(
        execution_id: &str,
        workflow_id: &str,
        node_id: &str,
        node_name: &str,
        status: RunStatus,
        node_status: NodeStatus,
    ) -> Self {
        Self {
            node_id: Some(node_id.to_string()),
            node_name: Some(node_name.to_string()),
            node_status: Some(node_status),
            ..Self::base(execution_id, workflow_id, status)
        }
    }

    pub fn node_executing(execution_id: &str, workflow_id: &str, node_id: &str, node_name: &str) -> Self {
        Self::for_node(execution_id, workflow_id, node_id, node_name, RunStatus::Running, NodeStatus::Executing)
    }

    pub fn node_success(
        execution_id: &str,
        workflow_id: &str,
        node_id: &str,
        node_name: &str,
        response: Value,
    ) -> Self {
        Self {
            response: Some(response),
            ..Self::for_node(execution_id, workflow_id, node_id, node_name, RunStatus::Running, NodeStatus::Success)
        }
    }

    pub fn node_skipped(
        execution_id: &str,
        workflow_id: &str,
        node_id: &str,
        node_name: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::for_node(execution_id, workflow_id, node_id, node_name, RunStatus::Running, NodeStatus::Skipped)
        }
    }

    /// Terminal event for a node failure; carries the outputs gathered so far
    pub fn node_failed(
        execution_id: &str,
        workflow_id: &str,
        node_id: &str,
        node_name: &str,
        message: impl Into<String>,
        response: Value,
        outputs: Value,
    ) -> Self {
        Self {
            message: Some(message.into()),
            response: Some(response),
            json: Some(outputs),
            ..Self::for_node(execution_id, workflow_id, node_id, node_name, RunStatus::Failed, NodeStatus::Failed)
        }
    }

    /// Terminal event for a run that failed before reaching any node
    pub fn run_failed(execution_id: &str, workflow_id: &str, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::base(execution_id, workflow_id, RunStatus::Failed)
        }
    }

    pub fn run_succeeded(execution_id: &str, workflow_id: &str, outputs: Value) -> Self {
        Self {
            json: Some(outputs),
            ..Self::base(execution_id, workflow_id, RunStatus::Success)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != RunStatus::Running
    }
}

// ============================================================================
// Publishers
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event channel is closed")]
    Closed,

    #[error("Event channel is full")]
    Full,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fire-and-forget sink for progress events
///
/// `channel` is the execution id; relays use it to route events to the
/// observers of that execution.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, channel: &str, event: ExecutionEvent) -> Result<(), PublishError>;
}

/// An event together with the channel it was published on
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub channel: String,
    pub event: ExecutionEvent,
}

/// Publishes onto an `async-channel` for an external relay to drain
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: async_channel::Sender<PublishedEvent>,
}

impl ChannelPublisher {
    pub fn bounded(capacity: usize) -> (Self, async_channel::Receiver<PublishedEvent>) {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn unbounded() -> (Self, async_channel::Receiver<PublishedEvent>) {
        let (tx, rx) = async_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, channel: &str, event: ExecutionEvent) -> Result<(), PublishError> {
        self.tx
            .try_send(PublishedEvent {
                channel: channel.to_string(),
                event,
            })
            .map_err(|e| match e {
                async_channel::TrySendError::Full(_) => PublishError::Full,
                async_channel::TrySendError::Closed(_) => PublishError::Closed,
            })
    }
}

/// Writes every event to the log as JSON
#[derive(Debug, Clone, Default)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, channel: &str, event: ExecutionEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(&event)?;
        info!(channel = %channel, event = %payload, "Execution event");
        Ok(())
    }
}

/// Counters for published and rejected events
#[derive(Debug, Default)]
pub struct PublishStats {
    published: AtomicU64,
    failed: AtomicU64,
}

impl PublishStats {
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Wraps a publisher so that failures are observed instead of propagated
#[derive(Clone)]
pub struct EventRelay {
    publisher: Arc<dyn EventPublisher>,
    stats: Arc<PublishStats>,
}

impl EventRelay {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            publisher,
            stats: Arc::new(PublishStats::default()),
        }
    }

    pub fn emit(&self, channel: &str, event: ExecutionEvent) {
        match self.publisher.publish(channel, event) {
            Ok(()) => {
                self.stats.published.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(channel = %channel, error = %e, "Failed to publish execution event");
            }
        }
    }

    pub fn stats(&self) -> Arc<PublishStats> {
        self.stats.clone()
    }
}
