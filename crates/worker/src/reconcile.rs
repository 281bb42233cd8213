//! Periodic reconciliation of jobs the in-memory queue lost track of.
//!
//! A job can be stranded two ways: the process restarted with jobs still
//! queued (they stay `pending`), or it restarted mid-processing (the job
//! stays `processing`, with no spendings since completion commits with
//! the rows). The sweep re-enqueues the first kind and fails the second.

use std::time::Duration;

use chrono::Utc;
use duoledger_core::types::DbId;
use duoledger_db::repositories::SpendJobRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::queue::{JobQueue, QueueError, QueuedJob};

/// Maximum number of stale `pending` jobs re-enqueued per sweep.
const SWEEP_BATCH: i64 = 100;

/// Error message stored on jobs found stuck in `processing`.
pub const INTERRUPTED_MESSAGE: &str = "Processing was interrupted before the job finished";

/// What one sweep did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub requeued: Vec<DbId>,
    pub failed: Vec<DbId>,
}

/// Background task that finds and repairs stale jobs.
pub struct ReconciliationSweep {
    pool: PgPool,
    queue: JobQueue,
    interval: Duration,
    stale_after: Duration,
}

impl ReconciliationSweep {
    pub fn new(pool: PgPool, queue: JobQueue, interval: Duration, stale_after: Duration) -> Self {
        Self {
            pool,
            queue,
            interval,
            stale_after,
        }
    }

    /// Run until `cancel` fires. The first sweep runs immediately, which
    /// picks up anything left over from a previous process.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            stale_after_secs = self.stale_after.as_secs(),
            "Reconciliation sweep started",
        );

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Reconciliation sweep stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.sweep_once().await {
                        Ok(report) => {
                            if report.requeued.is_empty() && report.failed.is_empty() {
                                tracing::debug!("Reconciliation sweep: nothing stale");
                            } else {
                                tracing::info!(
                                    requeued = report.requeued.len(),
                                    failed = report.failed.len(),
                                    "Reconciliation sweep repaired stale jobs",
                                );
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Reconciliation sweep failed");
                        }
                    }
                }
            }
        }
    }

    /// One pass: fail stale `processing` jobs, then re-enqueue stale
    /// `pending` ones that are not already queued while the queue has room.
    pub async fn sweep_once(&self) -> Result<SweepReport, sqlx::Error> {
        let stale_after =
            chrono::Duration::from_std(self.stale_after).unwrap_or_else(|_| chrono::Duration::days(1));
        let cutoff = Utc::now() - stale_after;

        let failed = SpendJobRepo::fail_stale_processing(&self.pool, cutoff, INTERRUPTED_MESSAGE).await?;
        for job_id in &failed {
            tracing::warn!(job_id, "Failed job stuck in processing");
        }

        let mut requeued = Vec::new();
        for job_id in SpendJobRepo::list_stale_pending(&self.pool, cutoff, SWEEP_BATCH).await? {
            match self.queue.try_enqueue(QueuedJob { job_id }) {
                Ok(true) => {
                    SpendJobRepo::mark_requeued(&self.pool, job_id).await?;
                    requeued.push(job_id);
                }
                Ok(false) => {
                    // Still waiting behind a backlog; restart its clock only.
                    tracing::debug!(job_id, "Stale job is already queued");
                    SpendJobRepo::mark_requeued(&self.pool, job_id).await?;
                }
                Err(QueueError::Full) => {
                    tracing::debug!("Job queue full, deferring remaining stale jobs");
                    break;
                }
                Err(QueueError::Closed) => {
                    tracing::warn!("Job queue closed, cannot re-enqueue stale jobs");
                    break;
                }
            }
        }

        Ok(SweepReport { requeued, failed })
    }
}
