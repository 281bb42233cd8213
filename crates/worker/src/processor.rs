//! Processing of a single spend job.
//!
//! Classification and validation finish before anything is written; all
//! writes, including the `completed` transition, happen in one
//! transaction. A job therefore either ends `completed` with a consistent
//! set of spendings or `failed` with none.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::Utc;
use duoledger_classifier::{ClassifierError, DynClassifier};
use duoledger_core::classification::{parse_classification, ResolvedLineItem};
use duoledger_core::prompt::{build_classification_prompt, PromptContext};
use duoledger_core::types::DbId;
use duoledger_db::models::spend_job::SpendJob;
use duoledger_db::models::spending::{NewSpending, NewUserSpending};
use duoledger_db::repositories::{CategoryRepo, SpendJobRepo, SpendingRepo};
use futures::FutureExt;
use sqlx::PgPool;

use crate::error::ProcessingError;

/// How a call to [`JobProcessor::process`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Committed with this many spendings.
    Completed { spendings: usize },
    /// Marked `failed` (or found already terminal while recording the failure).
    Failed,
    /// Not claimed: unknown, already taken, or the claim query failed.
    Skipped,
}

/// Drives one job from `pending` to a terminal state.
pub struct JobProcessor {
    pool: PgPool,
    classifier: DynClassifier,
    classify_deadline: Duration,
}

/// Everything the persistence transaction needs from a classification.
struct ValidatedResult {
    items: Vec<ResolvedLineItem>,
    is_ambiguous: bool,
    ambiguity_reason: Option<String>,
}

impl JobProcessor {
    /// `classify_deadline` bounds the whole classification call, retries
    /// included.
    pub fn new(pool: PgPool, classifier: DynClassifier, classify_deadline: Duration) -> Self {
        Self {
            pool,
            classifier,
            classify_deadline,
        }
    }

    /// Process one job. Never returns an error: every failure after the
    /// claim is recorded on the job and logged.
    pub async fn process(&self, job_id: DbId) -> JobOutcome {
        let job = match SpendJobRepo::claim(&self.pool, job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::debug!(job_id, "Job is not pending, skipping");
                return JobOutcome::Skipped;
            }
            Err(e) => {
                // The job stays pending; the reconciliation sweep re-enqueues it.
                tracing::error!(job_id, error = %e, "Failed to claim job");
                return JobOutcome::Skipped;
            }
        };

        tracing::info!(job_id, buyer_id = job.buyer_id, "Processing spend job");

        let result = AssertUnwindSafe(self.run(&job))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ProcessingError::Panicked(panic_message(&*panic))));

        match result {
            Ok(spendings) => {
                tracing::info!(job_id, spendings, "Spend job completed");
                JobOutcome::Completed { spendings }
            }
            Err(err) => {
                self.record_failure(job_id, &err).await;
                JobOutcome::Failed
            }
        }
    }

    async fn run(&self, job: &SpendJob) -> Result<usize, ProcessingError> {
        let validated = self.classify(job).await?;
        let count = validated.items.len();
        self.persist(job, validated).await?;
        Ok(count)
    }

    /// Classify and validate. Reads the catalog, writes nothing.
    async fn classify(&self, job: &SpendJob) -> Result<ValidatedResult, ProcessingError> {
        let categories = CategoryRepo::list_names(&self.pool).await?;
        let prompt = build_classification_prompt(&PromptContext {
            declared_amount: job.declared_amount,
            description: &job.prompt,
            has_partner: job.partner_id.is_some(),
            categories: &categories,
        });

        let payload = tokio::time::timeout(self.classify_deadline, self.classifier.classify(&prompt))
            .await
            .map_err(|_| ClassifierError::Timeout(self.classify_deadline))??;

        let classification = parse_classification(&payload)?;
        classification.validate_apportionment(job.partner_id)?;

        let total = classification.total();
        if total != job.declared_amount {
            tracing::warn!(
                job_id = job.id,
                declared = %job.declared_amount,
                classified = %total,
                "Classified line items do not add up to the declared amount",
            );
        }

        let catalog = CategoryRepo::resolve_names(&self.pool, &classification.category_keys()).await?;

        let is_ambiguous = classification.is_ambiguous;
        let ambiguity_reason = classification.ambiguity_reason.clone();
        let items = classification.resolve(job.partner_id, &catalog)?;

        Ok(ValidatedResult {
            items,
            is_ambiguous,
            ambiguity_reason,
        })
    }

    /// One transaction for every row plus the `completed` transition.
    async fn persist(&self, job: &SpendJob, result: ValidatedResult) -> Result<(), ProcessingError> {
        let spent_on = job.spent_on();
        let settled_at = job.pre_settled.then(Utc::now);

        let mut tx = self.pool.begin().await?;

        for item in result.items {
            let spending_id = SpendingRepo::insert_spending(
                &mut *tx,
                &NewSpending {
                    amount: item.amount,
                    description: item.description,
                    category_id: item.category_id,
                    buyer_id: job.buyer_id,
                    spent_on,
                },
            )
            .await?;

            SpendingRepo::link_to_job(&mut *tx, job.id, spending_id).await?;

            SpendingRepo::insert_user_spending(
                &mut *tx,
                &NewUserSpending {
                    spending_id,
                    buyer_id: job.buyer_id,
                    shared_with_id: item.apportionment.shared_with,
                    takes_all: item.apportionment.takes_all,
                    settled_at,
                },
            )
            .await?;
        }

        let completed = SpendJobRepo::complete(
            &mut *tx,
            job.id,
            result.is_ambiguous,
            result.ambiguity_reason.as_deref(),
        )
        .await?;
        if !completed {
            // Dropping `tx` rolls back.
            return Err(ProcessingError::LostClaim);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn record_failure(&self, job_id: DbId, err: &ProcessingError) {
        let message = err.to_string();
        tracing::warn!(job_id, error = %message, "Spend job failed");

        match SpendJobRepo::fail(&self.pool, job_id, &message).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(job_id, "Job was already terminal, failure not recorded");
            }
            Err(e) => {
                tracing::error!(
                    job_id,
                    error = %e,
                    "Could not mark job failed, it stays processing until the reconciliation sweep",
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
