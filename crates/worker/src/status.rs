//! Read path for job pollers.

use chrono::NaiveDate;
use duoledger_core::apportion::ApportionMode;
use duoledger_core::types::{DbId, Money, Timestamp};
use duoledger_db::models::spend_job::SpendJob;
use duoledger_db::models::spending::JobSpending;
use duoledger_db::repositories::SpendingRepo;
use serde::Serialize;
use sqlx::PgPool;

/// Externally visible state of a job.
///
/// Ambiguity and spendings are only reported once the job is finished;
/// before that they carry no meaning.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusReport {
    pub job_id: DbId,
    pub status: &'static str,
    pub is_finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ambiguous: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambiguity_reason: Option<String>,
    pub declared_amount: Money,
    pub pre_settled: bool,
    pub created_at: Timestamp,
    pub status_updated_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spendings: Option<Vec<SpendingReport>>,
}

/// One spending linked to a completed job.
#[derive(Debug, Clone, Serialize)]
pub struct SpendingReport {
    pub spending_id: DbId,
    pub amount: Money,
    pub description: String,
    pub category_id: DbId,
    pub category: String,
    pub spent_on: NaiveDate,
    pub apportion_mode: ApportionMode,
    pub shared_with_id: Option<DbId>,
    pub takes_all: bool,
    pub settled_at: Option<Timestamp>,
}

impl From<JobSpending> for SpendingReport {
    fn from(s: JobSpending) -> Self {
        let apportion_mode = s.apportion_mode();
        Self {
            spending_id: s.spending_id,
            amount: s.amount,
            description: s.description,
            category_id: s.category_id,
            category: s.category_name,
            spent_on: s.spent_on,
            apportion_mode,
            shared_with_id: s.shared_with_id,
            takes_all: s.takes_all,
            settled_at: s.settled_at,
        }
    }
}

impl JobStatusReport {
    /// Full report, loading linked spendings for finished jobs.
    pub async fn for_job(pool: &PgPool, job: SpendJob) -> Result<Self, sqlx::Error> {
        let spendings = if job.is_finished {
            let rows = SpendingRepo::list_for_job(pool, job.id).await?;
            Some(rows.into_iter().map(SpendingReport::from).collect())
        } else {
            None
        };
        let mut report = Self::summary(job);
        report.spendings = spendings;
        Ok(report)
    }

    /// Report without spendings, for listings.
    pub fn summary(job: SpendJob) -> Self {
        let status = job.status().map_or("unknown", |s| s.name());
        let finished = job.is_finished;
        Self {
            job_id: job.id,
            status,
            is_finished: finished,
            error_message: job.error_message,
            is_ambiguous: finished.then_some(job.is_ambiguous),
            ambiguity_reason: if finished { job.ambiguity_reason } else { None },
            declared_amount: job.declared_amount,
            pre_settled: job.pre_settled,
            created_at: job.created_at,
            status_updated_at: job.status_updated_at,
            spendings: None,
        }
    }
}
