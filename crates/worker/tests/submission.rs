//! Submission service: validation, identity, capacity.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::*;
use duoledger_core::error::CoreError;
use duoledger_core::types::Money;
use duoledger_db::models::spend_job::SubmitSpendJob;
use duoledger_db::models::status::SpendJobStatus;
use duoledger_worker::{JobQueue, QueuedJob, SubmissionError, SubmissionService};
use sqlx::PgPool;

const WAIT: Duration = Duration::from_millis(50);

async fn job_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM spend_jobs")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn valid_submission_is_pending_and_queued(pool: PgPool) {
    let home = household(&pool).await;
    let (queue, receiver) = JobQueue::bounded(4);
    let service = SubmissionService::new(pool.clone(), queue, WAIT);

    let job = service
        .submit(home.buyer, &submission(7500, "  groceries and bus  "))
        .await
        .unwrap();

    assert_eq!(job.status(), Some(SpendJobStatus::Pending));
    assert!(!job.is_finished);
    assert_eq!(job.prompt, "groceries and bus");
    assert_eq!(job.declared_amount, Money::new(7500, 2));
    assert_eq!(job.partner_id, Some(home.partner));

    assert_eq!(receiver.recv().await, Some(QueuedJob { job_id: job.id }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn amount_is_rounded_to_cents(pool: PgPool) {
    let buyer = single_buyer(&pool).await;
    let (queue, _receiver) = JobQueue::bounded(4);
    let service = SubmissionService::new(pool.clone(), queue, WAIT);

    let input = SubmitSpendJob {
        amount: Money::new(12_345, 3),
        ..submission(0, "lunch")
    };
    let job = service.submit(buyer, &input).await.unwrap();
    assert_eq!(job.declared_amount, Money::new(1234, 2));
    assert_eq!(job.partner_id, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_input_creates_no_job(pool: PgPool) {
    let buyer = single_buyer(&pool).await;
    let (queue, _receiver) = JobQueue::bounded(4);
    let service = SubmissionService::new(pool.clone(), queue, WAIT);

    let bad = [
        submission(1000, "   "),
        submission(0, "coffee"),
        submission(-500, "coffee"),
        submission(1_000_000_000_000, "coffee"),
        SubmitSpendJob {
            transaction_date: Some("31/12/2024".into()),
            ..submission(1000, "coffee")
        },
    ];
    for input in &bad {
        assert_matches!(
            service.submit(buyer, input).await,
            Err(SubmissionError::Core(CoreError::Validation(_)))
        );
    }
    assert_eq!(job_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_buyer_is_unauthorized(pool: PgPool) {
    let (queue, _receiver) = JobQueue::bounded(4);
    let service = SubmissionService::new(pool.clone(), queue.clone(), WAIT);

    assert_matches!(
        service.submit(99_999, &submission(1000, "coffee")).await,
        Err(SubmissionError::Core(CoreError::Unauthorized(_)))
    );
    assert_eq!(job_count(&pool).await, 0);
    assert_eq!(queue.available(), 4);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn full_queue_rejects_without_persisting(pool: PgPool) {
    let buyer = single_buyer(&pool).await;
    let (queue, receiver) = JobQueue::bounded(1);
    let service = SubmissionService::new(pool.clone(), queue, WAIT);

    let first = service.submit(buyer, &submission(1000, "coffee")).await.unwrap();
    assert_matches!(
        service.submit(buyer, &submission(2000, "tea")).await,
        Err(SubmissionError::AtCapacity)
    );
    assert_eq!(job_count(&pool).await, 1);

    // Draining frees the slot again.
    assert_eq!(receiver.recv().await, Some(QueuedJob { job_id: first.id }));
    assert!(service.submit(buyer, &submission(2000, "tea")).await.is_ok());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn closed_queue_rejects(pool: PgPool) {
    let buyer = single_buyer(&pool).await;
    let (queue, receiver) = JobQueue::bounded(1);
    drop(receiver);
    let service = SubmissionService::new(pool.clone(), queue, WAIT);

    assert_matches!(
        service.submit(buyer, &submission(1000, "coffee")).await,
        Err(SubmissionError::QueueClosed)
    );
    assert_eq!(job_count(&pool).await, 0);
}
