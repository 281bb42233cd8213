//! Repository for the `spend_jobs` table.
//!
//! Every status transition is conditional on the current status, so the
//! lifecycle `pending -> processing -> {completed, failed}` can only move
//! forward no matter how many workers or sweeps touch the same row.

use duoledger_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::spend_job::{CreateSpendJob, SpendJob};
use crate::models::status::SpendJobStatus;

/// Column list for `spend_jobs` queries.
const COLUMNS: &str = "\
    id, buyer_id, partner_id, prompt, declared_amount, transaction_date, \
    pre_settled, status_id, is_finished, error_message, \
    is_ambiguous, ambiguity_reason, created_at, status_updated_at";

/// Maximum page size for job listing.
pub const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
pub const DEFAULT_LIMIT: i64 = 50;

/// Provides lifecycle operations for spend jobs.
pub struct SpendJobRepo;

impl SpendJobRepo {
    /// Insert a new `pending` job on the caller's connection or transaction.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &CreateSpendJob,
    ) -> Result<SpendJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO spend_jobs \
                 (buyer_id, partner_id, prompt, declared_amount, transaction_date, \
                  pre_settled, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SpendJob>(&query)
            .bind(input.buyer_id)
            .bind(input.partner_id)
            .bind(&input.prompt)
            .bind(input.declared_amount)
            .bind(input.transaction_date)
            .bind(input.pre_settled)
            .bind(SpendJobStatus::Pending.id())
            .fetch_one(conn)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SpendJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM spend_jobs WHERE id = $1");
        sqlx::query_as::<_, SpendJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move a job from `pending` to `processing`.
    ///
    /// Returns `None` if the job does not exist or is no longer pending,
    /// which is how a worker learns that another worker already took it.
    pub async fn claim(pool: &PgPool, id: DbId) -> Result<Option<SpendJob>, sqlx::Error> {
        let query = format!(
            "UPDATE spend_jobs \
             SET status_id = $2, status_updated_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SpendJob>(&query)
            .bind(id)
            .bind(SpendJobStatus::Processing.id())
            .bind(SpendJobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a `processing` job `completed` with its ambiguity metadata.
    ///
    /// Runs on the transaction that wrote the job's spendings. Returns
    /// `false` if the job was not `processing`; callers roll back.
    pub async fn complete(
        conn: &mut PgConnection,
        id: DbId,
        is_ambiguous: bool,
        ambiguity_reason: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE spend_jobs \
             SET status_id = $2, is_finished = TRUE, is_ambiguous = $3, \
                 ambiguity_reason = $4, status_updated_at = NOW() \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(id)
        .bind(SpendJobStatus::Completed.id())
        .bind(is_ambiguous)
        .bind(ambiguity_reason)
        .bind(SpendJobStatus::Processing.id())
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a non-terminal job `failed` with a human-readable message.
    ///
    /// Returns `false` if the job was already terminal; its stored message
    /// is left untouched.
    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE spend_jobs \
             SET status_id = $2, is_finished = TRUE, error_message = $3, \
                 status_updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($4, $5)",
        )
        .bind(id)
        .bind(SpendJobStatus::Failed.id())
        .bind(error)
        .bind(SpendJobStatus::Pending.id())
        .bind(SpendJobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List a buyer's jobs, newest first, with optional status filter.
    pub async fn list_by_buyer(
        pool: &PgPool,
        buyer_id: DbId,
        status: Option<SpendJobStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<SpendJob>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        let query = format!(
            "SELECT {COLUMNS} FROM spend_jobs \
             WHERE buyer_id = $1 AND ($2::SMALLINT IS NULL OR status_id = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, SpendJob>(&query)
            .bind(buyer_id)
            .bind(status.map(SpendJobStatus::id))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// IDs of jobs still `pending` whose last transition is older than
    /// `before`, oldest first.
    pub async fn list_stale_pending(
        pool: &PgPool,
        before: Timestamp,
        limit: i64,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM spend_jobs \
             WHERE status_id = $1 AND status_updated_at < $2 \
             ORDER BY status_updated_at ASC \
             LIMIT $3",
        )
        .bind(SpendJobStatus::Pending.id())
        .bind(before)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Restart the staleness clock of a `pending` job that was just
    /// re-enqueued. Returns `false` if it is no longer pending.
    pub async fn mark_requeued(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE spend_jobs SET status_updated_at = NOW() \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(id)
        .bind(SpendJobStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fail every job stuck in `processing` since before `before`.
    ///
    /// Such jobs never have spendings: completion commits in the same
    /// transaction as the rows. Returns the IDs that were failed.
    pub async fn fail_stale_processing(
        pool: &PgPool,
        before: Timestamp,
        error: &str,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "UPDATE spend_jobs \
             SET status_id = $1, is_finished = TRUE, error_message = $2, \
                 status_updated_at = NOW() \
             WHERE status_id = $3 AND status_updated_at < $4 \
             RETURNING id",
        )
        .bind(SpendJobStatus::Failed.id())
        .bind(error)
        .bind(SpendJobStatus::Processing.id())
        .bind(before)
        .fetch_all(pool)
        .await
    }
}
