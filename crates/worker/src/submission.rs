//! Submission path: validate, reserve capacity, persist, enqueue.

use std::time::Duration;

use duoledger_core::error::CoreError;
use duoledger_core::submission::validate_submission;
use duoledger_core::types::DbId;
use duoledger_db::models::spend_job::{CreateSpendJob, SpendJob, SubmitSpendJob};
use duoledger_db::repositories::{SpendJobRepo, UserRepo};
use sqlx::PgPool;

use crate::error::SubmissionError;
use crate::queue::{JobQueue, QueueError, QueuedJob};

/// Accepts spend submissions on behalf of authenticated buyers.
#[derive(Clone)]
pub struct SubmissionService {
    pool: PgPool,
    queue: JobQueue,
    enqueue_timeout: Duration,
}

impl SubmissionService {
    pub fn new(pool: PgPool, queue: JobQueue, enqueue_timeout: Duration) -> Self {
        Self {
            pool,
            queue,
            enqueue_timeout,
        }
    }

    /// Submit a spend for asynchronous categorization.
    ///
    /// A queue slot is reserved before the job row is written, so on
    /// [`SubmissionError::AtCapacity`] nothing was persisted and the caller
    /// may simply retry. On success the job is `pending` and already queued.
    pub async fn submit(
        &self,
        buyer_id: DbId,
        input: &SubmitSpendJob,
    ) -> Result<SpendJob, SubmissionError> {
        let validated = validate_submission(
            &input.prompt,
            input.amount,
            input.pre_settled,
            input.transaction_date.as_deref(),
        )?;

        let slot = self
            .queue
            .reserve(self.enqueue_timeout)
            .await
            .map_err(|e| match e {
                QueueError::Full => SubmissionError::AtCapacity,
                QueueError::Closed => SubmissionError::QueueClosed,
            })?;

        let mut tx = self.pool.begin().await?;

        let buyer = UserRepo::find_by_id(&mut *tx, buyer_id)
            .await?
            .ok_or_else(|| CoreError::Unauthorized(format!("Unknown user {buyer_id}")))?;

        let job = SpendJobRepo::insert(
            &mut *tx,
            &CreateSpendJob {
                buyer_id: buyer.id,
                partner_id: buyer.partner_id,
                prompt: validated.prompt,
                declared_amount: validated.declared_amount,
                transaction_date: validated.transaction_date,
                pre_settled: validated.pre_settled,
            },
        )
        .await?;

        tx.commit().await?;

        slot.send(QueuedJob { job_id: job.id });

        tracing::info!(
            job_id = job.id,
            buyer_id,
            partner_id = ?job.partner_id,
            amount = %job.declared_amount,
            "Spend job submitted",
        );

        Ok(job)
    }
}
