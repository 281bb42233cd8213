//! Bounded in-process queue between submission and the worker pool.
//!
//! Submission reserves a slot *before* writing the job row and fills it
//! after commit, so a persisted job is never dropped for lack of capacity.
//! The queue also tracks which job IDs it currently holds, so the
//! reconciliation sweep never enqueues a job that is only waiting in line.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use duoledger_core::types::DbId;
use tokio::sync::{mpsc, Mutex};

/// Lightweight job descriptor. Workers reload the row by ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedJob {
    pub job_id: DbId,
}

/// Errors from enqueueing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Job queue is full")]
    Full,

    #[error("Job queue is closed")]
    Closed,
}

/// IDs currently sitting in the channel.
type QueuedIds = Arc<std::sync::Mutex<HashSet<DbId>>>;

/// Producer side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<QueuedJob>,
    queued: QueuedIds,
}

/// Consumer side of the queue, shared by every worker.
#[derive(Debug, Clone)]
pub struct JobReceiver {
    inner: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
    queued: QueuedIds,
}

/// A reserved queue slot. Dropping it releases the slot unused.
#[derive(Debug)]
pub struct QueueSlot {
    permit: mpsc::OwnedPermit<QueuedJob>,
    queued: QueuedIds,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` jobs.
    pub fn bounded(capacity: usize) -> (JobQueue, JobReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let queued = QueuedIds::default();
        (
            JobQueue {
                sender,
                queued: queued.clone(),
            },
            JobReceiver {
                inner: Arc::new(Mutex::new(receiver)),
                queued,
            },
        )
    }

    /// Wait up to `wait` for a free slot.
    pub async fn reserve(&self, wait: Duration) -> Result<QueueSlot, QueueError> {
        match tokio::time::timeout(wait, self.sender.clone().reserve_owned()).await {
            Ok(Ok(permit)) => Ok(QueueSlot {
                permit,
                queued: self.queued.clone(),
            }),
            Ok(Err(_)) => Err(QueueError::Closed),
            Err(_) => Err(QueueError::Full),
        }
    }

    /// Enqueue without waiting. Returns `Ok(false)` without enqueueing
    /// when the job is already waiting in the queue.
    pub fn try_enqueue(&self, job: QueuedJob) -> Result<bool, QueueError> {
        let mut queued = self.queued.lock().unwrap_or_else(PoisonError::into_inner);
        if !queued.insert(job.job_id) {
            return Ok(false);
        }
        self.sender.try_send(job).map(|()| true).map_err(|e| {
            queued.remove(&job.job_id);
            match e {
                mpsc::error::TrySendError::Full(_) => QueueError::Full,
                mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            }
        })
    }

    /// Whether `job_id` is waiting in the queue right now.
    pub fn contains(&self, job_id: DbId) -> bool {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&job_id)
    }

    /// Number of free slots right now.
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }
}

impl QueueSlot {
    /// Fill the slot. Never fails: capacity was reserved up front.
    pub fn send(self, job: QueuedJob) {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job.job_id);
        self.permit.send(job);
    }
}

impl JobReceiver {
    /// Wait for the next job. Returns `None` once every producer is gone
    /// and the queue is drained.
    pub async fn recv(&self) -> Option<QueuedJob> {
        let job = self.inner.lock().await.recv().await?;
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job.job_id);
        Some(job)
    }
}
