//! # agentflow
//!
//! A graph execution engine for node-based workflow automation.
//!
//! ## Features
//!
//! - **Node graphs** - Triggers, actions, agents, models, and tools joined by edges
//! - **Agent sub-graphs** - Agents get their chat model and tools from connected sub-nodes
//! - **Expression syntax** - Use `{{ nodeId.json.field }}` to read earlier outputs
//! - **Progress events** - One event per node state change, one terminal event per run
//! - **Workers** - Any number of workers pulling jobs from a shared queue
//!
//! ## Node kinds
//!
//! - **trigger**: Entry point of a run (`manualTrigger`, `webhookTrigger`)
//! - **action**: Ordinary step (`httpRequest`, `shellCommand`, `setData`)
//! - **agent**: Prompts a connected model (`aiAgent`)
//! - **model**: Supplies a chat model to an agent (`openAiChatModel`)
//! - **tool**: Supplies a tool to an agent (`httpRequestTool`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agentflow::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let job: WorkflowJob = serde_yaml::from_str(r#"
//! workflowId: hello
//! nodes:
//!   - { id: start, kind: trigger, name: manualTrigger }
//!   - id: greet
//!     kind: action
//!     name: setData
//!     parameters:
//!       values: { message: "hello" }
//! edges:
//!   - { id: e1, source: start, target: greet }
//! "#)?;
//!
//!     let registry = NodeRegistry::with_builtins(
//!         Arc::new(InMemoryCredentialStore::new()),
//!         &EngineConfig::default(),
//!     );
//!     let executor = GraphExecutor::new(
//!         Arc::new(registry),
//!         Arc::new(TracingPublisher),
//!         Arc::new(InMemoryStatusSink::new()),
//!     );
//!
//!     let report = executor.run_job(job).await?;
//!     println!("{}", report.outputs);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod workflow;

// Re-export main types
pub use engine::{
    ChannelPublisher, EventPublisher, ExecutionEvent, ExecutionReport, ExecutorError,
    GraphExecutor, HandlerError, InMemoryCredentialStore, InMemoryStatusSink, JobQueue,
    ModelResolutionError, NodeRegistry, NodeStatus, RunStatus, TracingPublisher,
};
pub use workflow::{
    Edge, EngineConfig, ExecutionContext, JobLoader, LoadError, Node, NodeKind, OutputStore,
    WorkflowJob,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::{
        run_workers, AgentArgs, AgentHandler, ChannelPublisher, ChatModel, ChatRequest,
        ChatResponse, CredentialStore, EventPublisher, ExecutionEvent, ExecutionReport,
        ExecutionStatus, ExecutorError, GraphExecutor, HandlerError, InMemoryCredentialStore,
        InMemoryStatusSink, JobQueue, ModelProvider, ModelResolutionError, NodeArgs, NodeHandler,
        NodeOutcome, NodeRegistry, NodeStatus, RunStatus, StatusSink, SuppliedModel, SupplyArgs,
        ToolCall, ToolDefinition, ToolProvider, TracingPublisher,
    };
    pub use crate::workflow::{
        Edge, EngineConfig, ExecutionContext, JobLoader, LoadError, Node, NodeKind, WorkflowJob,
    };
}
