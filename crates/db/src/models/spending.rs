//! Spending, user-spending, and job link models.

use chrono::NaiveDate;
use duoledger_core::apportion::{ApportionMode, Apportionment};
use duoledger_core::types::{DbId, Money, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Insert DTO for the `spendings` table.
#[derive(Debug, Clone)]
pub struct NewSpending {
    pub amount: Money,
    pub description: String,
    pub category_id: DbId,
    pub buyer_id: DbId,
    pub spent_on: NaiveDate,
}

/// Insert DTO for the `user_spendings` table.
#[derive(Debug, Clone)]
pub struct NewUserSpending {
    pub spending_id: DbId,
    pub buyer_id: DbId,
    pub shared_with_id: Option<DbId>,
    pub takes_all: bool,
    pub settled_at: Option<Timestamp>,
}

/// A spending produced by a job, joined with its user-spending row and
/// category name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobSpending {
    pub spending_id: DbId,
    pub amount: Money,
    pub description: String,
    pub category_id: DbId,
    pub category_name: String,
    pub buyer_id: DbId,
    pub spent_on: NaiveDate,
    pub shared_with_id: Option<DbId>,
    pub takes_all: bool,
    pub settled_at: Option<Timestamp>,
}

impl JobSpending {
    /// Apportionment mode recovered from the stored fields.
    pub fn apportion_mode(&self) -> ApportionMode {
        Apportionment {
            shared_with: self.shared_with_id,
            takes_all: self.takes_all,
        }
        .mode()
    }
}
