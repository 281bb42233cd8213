//! Fixed-size pool of pull loops over the shared [`JobReceiver`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::processor::JobProcessor;
use crate::queue::JobReceiver;

/// Handles to the running workers.
///
/// Each worker takes one job at a time and runs it to a terminal state
/// before pulling the next. Cancellation stops the pulling; a job already
/// being processed is allowed to finish.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawn `worker_count` workers (at least one).
    pub fn start(
        processor: Arc<JobProcessor>,
        receiver: JobReceiver,
        worker_count: usize,
        cancel: CancellationToken,
    ) -> Self {
        let worker_count = worker_count.max(1);
        tracing::info!(worker_count, "Starting worker pool");

        let handles = (0..worker_count)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&processor),
                    receiver.clone(),
                    cancel.clone(),
                ))
            })
            .collect();

        Self { handles, cancel }
    }

    /// Number of spawned workers.
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Stop pulling and wait up to `timeout` for in-flight jobs.
    ///
    /// Workers still busy after the timeout are aborted; their jobs stay
    /// `processing` until the reconciliation sweep fails them.
    pub async fn shutdown(self, timeout: Duration) {
        self.cancel.cancel();

        let aborts: Vec<_> = self.handles.iter().map(JoinHandle::abort_handle).collect();
        let joined = futures::future::join_all(self.handles);

        if tokio::time::timeout(timeout, joined).await.is_err() {
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Workers did not finish in time, aborting",
            );
            for handle in aborts {
                handle.abort();
            }
        } else {
            tracing::info!("Worker pool stopped");
        }
    }
}

async fn run_worker(
    worker: usize,
    processor: Arc<JobProcessor>,
    receiver: JobReceiver,
    cancel: CancellationToken,
) {
    tracing::debug!(worker, "Worker started");

    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = receiver.recv() => job,
        };

        let Some(job) = job else {
            tracing::debug!(worker, "Job queue closed");
            break;
        };

        let outcome = processor.process(job.job_id).await;
        tracing::debug!(worker, job_id = job.job_id, ?outcome, "Job finished");
    }

    tracing::debug!(worker, "Worker stopped");
}
