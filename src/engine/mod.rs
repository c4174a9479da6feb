//! Workflow execution engine module
//!
//! This module contains:
//! - `executor` - The graph executor
//! - `dispatcher` - Routes nodes to their handlers
//! - `model_resolver` - Supplies models and tools to agent nodes
//! - `registry` - Handlers by node kind and name
//! - `contracts` - Handler traits and chat model types
//! - `handlers` - Built-in node handlers
//! - `events` - Progress events and publishers
//! - `status` - External run status
//! - `credentials` - Credential lookup for handlers
//! - `worker` - Job queue and workers
//! - `validation` - Static graph checks
//! - `error` - Executor error types
//! - `result` - Handler outcome and execution report types

pub mod contracts;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod executor;
pub mod handlers;
pub mod model_resolver;
pub mod registry;
pub mod result;
pub mod status;
pub mod validation;
pub mod worker;

pub use contracts::{
    AgentArgs, AgentHandler, ChatModel, ChatRequest, ChatResponse, ModelProvider, NodeArgs,
    NodeHandler, SuppliedModel, SupplyArgs, ToolCall, ToolDefinition, ToolProvider,
};
pub use credentials::{CredentialError, CredentialStore, InMemoryCredentialStore};
pub use dispatcher::{DispatchOutcome, NodeDispatcher};
pub use error::{error_stack, ExecutorError, HandlerError, ModelResolutionError};
pub use events::{
    ChannelPublisher, EventPublisher, EventRelay, ExecutionEvent, NodeStatus, PublishError,
    PublishStats, PublishedEvent, RunStatus, TracingPublisher,
};
pub use executor::GraphExecutor;
pub use model_resolver::{ModelResolver, ResolvedSubNodes};
pub use registry::NodeRegistry;
pub use result::{ExecutionReport, NodeOutcome};
pub use status::{ExecutionStatus, InMemoryStatusSink, StatusError, StatusRecord, StatusSink};
pub use validation::{validate, GraphIssue};
pub use worker::{run_workers, JobQueue, QueueError, Worker, WorkerSummary};
