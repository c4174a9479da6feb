//! External execution status
//!
//! The executor reports run status through [`StatusSink`]. Persistence lives
//! outside this crate; [`InMemoryStatusSink`] keeps records in memory for the
//! CLI and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Starting,
    Running,
    Success,
    Error,
    Canceled,
    Crashed,
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("Status store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait StatusSink: Send + Sync {
    /// `Running` without `finished` marks the start; `finished` marks the stop
    async fn update_status(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
        finished: bool,
    ) -> Result<(), StatusError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub status: ExecutionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    /// Every status reported, oldest first
    pub history: Vec<ExecutionStatus>,
}

#[derive(Debug, Default)]
pub struct InMemoryStatusSink {
    records: RwLock<HashMap<String, StatusRecord>>,
}

impl InMemoryStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, execution_id: &str) -> Option<StatusRecord> {
        self.records.read().await.get(execution_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl StatusSink for InMemoryStatusSink {
    async fn update_status(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
        finished: bool,
    ) -> Result<(), StatusError> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let record = records
            .entry(execution_id.to_string())
            .or_insert_with(|| StatusRecord {
                status,
                started_at: None,
                stopped_at: None,
                history: Vec::new(),
            });

        record.status = status;
        record.history.push(status);
        if finished {
            record.stopped_at = Some(now);
        } else if status == ExecutionStatus::Running {
            record.started_at = Some(now);
        }

        Ok(())
    }
}
