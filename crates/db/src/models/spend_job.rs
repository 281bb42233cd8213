//! Spend-job entity models and DTOs.

use chrono::NaiveDate;
use duoledger_core::types::{DbId, Money, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{SpendJobStatus, StatusId};

/// A row from the `spend_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SpendJob {
    pub id: DbId,
    pub buyer_id: DbId,
    /// Partner resolved once at submission; later partner changes are not
    /// reflected in this job.
    pub partner_id: Option<DbId>,
    pub prompt: String,
    pub declared_amount: Money,
    pub transaction_date: Option<NaiveDate>,
    pub pre_settled: bool,
    pub status_id: StatusId,
    pub is_finished: bool,
    pub error_message: Option<String>,
    pub is_ambiguous: bool,
    pub ambiguity_reason: Option<String>,
    pub created_at: Timestamp,
    pub status_updated_at: Timestamp,
}

impl SpendJob {
    /// Typed lifecycle status. `None` only if the lookup table gained a row
    /// this build does not know about.
    pub fn status(&self) -> Option<SpendJobStatus> {
        SpendJobStatus::from_id(self.status_id)
    }

    /// Date recorded on the job's spendings: the submitted transaction
    /// date, falling back to the job's creation day (UTC).
    pub fn spent_on(&self) -> NaiveDate {
        self.transaction_date
            .unwrap_or_else(|| self.created_at.date_naive())
    }
}

/// Insert DTO for a new pending job.
#[derive(Debug, Clone)]
pub struct CreateSpendJob {
    pub buyer_id: DbId,
    pub partner_id: Option<DbId>,
    pub prompt: String,
    pub declared_amount: Money,
    pub transaction_date: Option<NaiveDate>,
    pub pre_settled: bool,
}

/// Request body for `POST /api/v1/spend-jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitSpendJob {
    pub amount: Money,
    pub prompt: String,
    #[serde(default)]
    pub pre_settled: bool,
    /// `YYYY-MM-DD`; validated by the submission service.
    #[serde(default)]
    pub transaction_date: Option<String>,
}

/// Query parameters for `GET /api/v1/spend-jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct SpendJobListQuery {
    /// Filter by status name (`pending`, `processing`, `completed`, `failed`).
    pub status: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
