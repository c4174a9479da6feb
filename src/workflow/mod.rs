//! Workflow types and definitions
//!
//! This module contains the data the engine runs on:
//! - `graph` - Node, Edge, and WorkflowJob wire types
//! - `context` - ExecutionContext for one run
//! - `output_store` - Per-run node outputs
//! - `expressions` - Resolution of `{{ }}` references
//! - `loader` - Load jobs from files and directories
//! - `config` - Engine configuration

pub mod config;
pub mod context;
pub mod expressions;
pub mod graph;
pub mod loader;
pub mod output_store;

pub use config::EngineConfig;
pub use context::{ExecutionContext, SubNodes};
pub use expressions::{ExpressionResolver, ExpressionWarning};
pub use graph::{Edge, Node, NodeKind, WorkflowJob, MODEL_HANDLES, TOOL_HANDLES};
pub use loader::{JobLoader, LoadError};
pub use output_store::{NodeOutput, OutputStore};
