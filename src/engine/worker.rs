//! Job intake and workers
//!
//! Jobs arrive on a FIFO [`JobQueue`]. Each [`Worker`] pulls one job at a time
//! and runs it to completion before taking the next. A pool is just several
//! workers sharing the same receiver; executions never share state.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::engine::executor::GraphExecutor;
use crate::workflow::WorkflowJob;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Job queue is closed")]
    Closed,
}

/// FIFO queue of workflow jobs
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: async_channel::Sender<WorkflowJob>,
    rx: async_channel::Receiver<WorkflowJob>,
}

impl JobQueue {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        Self { tx, rx }
    }

    pub fn unbounded() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self { tx, rx }
    }

    /// Enqueue a job, waiting for room when the queue is bounded
    pub async fn enqueue(&self, job: WorkflowJob) -> Result<(), QueueError> {
        self.tx.send(job).await.map_err(|_| QueueError::Closed)
    }

    pub fn receiver(&self) -> async_channel::Receiver<WorkflowJob> {
        self.rx.clone()
    }

    /// Stop accepting jobs; workers drain what is left and exit
    pub fn close(&self) {
        self.tx.close();
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Counts of finished runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl WorkerSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    fn merge(self, other: WorkerSummary) -> WorkerSummary {
        WorkerSummary {
            succeeded: self.succeeded + other.succeeded,
            failed: self.failed + other.failed,
        }
    }
}

pub struct Worker {
    id: usize,
    executor: Arc<GraphExecutor>,
    jobs: async_channel::Receiver<WorkflowJob>,
}

impl Worker {
    pub fn new(
        id: usize,
        executor: Arc<GraphExecutor>,
        jobs: async_channel::Receiver<WorkflowJob>,
    ) -> Self {
        Self { id, executor, jobs }
    }

    /// Pull and run jobs until the queue is closed and drained
    #[instrument(skip(self), fields(worker = self.id))]
    pub async fn run(self) -> WorkerSummary {
        let mut summary = WorkerSummary::default();

        while let Ok(job) = self.jobs.recv().await {
            let workflow_id = job.workflow_id.clone();
            match self.executor.run_job(job).await {
                Ok(report) => {
                    info!(
                        workflow_id = %workflow_id,
                        execution_id = %report.execution_id,
                        "Job completed"
                    );
                    summary.succeeded += 1;
                }
                Err(e) => {
                    error!(workflow_id = %workflow_id, "Job failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Worker stopped"
        );
        summary
    }
}

/// Run `count` workers on one receiver until the queue closes
pub async fn run_workers(
    executor: Arc<GraphExecutor>,
    jobs: async_channel::Receiver<WorkflowJob>,
    count: usize,
) -> WorkerSummary {
    let workers: Vec<_> = (0..count.max(1))
        .map(|id| Worker::new(id, executor.clone(), jobs.clone()).run())
        .collect();

    join_all(workers)
        .await
        .into_iter()
        .fold(WorkerSummary::default(), WorkerSummary::merge)
}
