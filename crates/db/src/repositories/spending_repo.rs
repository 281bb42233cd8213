//! Repository for `spendings`, `user_spendings`, and `spend_job_spendings`.
//!
//! Inserts take `&mut PgConnection` and are meant to run inside the one
//! transaction that records a job's line items.

use duoledger_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::spending::{JobSpending, NewSpending, NewUserSpending};

/// Provides inserts and job-scoped reads for spendings.
pub struct SpendingRepo;

impl SpendingRepo {
    /// Insert a spending row. Returns its ID.
    pub async fn insert_spending(
        conn: &mut PgConnection,
        input: &NewSpending,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO spendings (amount, description, category_id, buyer_id, spent_on) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(input.amount)
        .bind(&input.description)
        .bind(input.category_id)
        .bind(input.buyer_id)
        .bind(input.spent_on)
        .fetch_one(conn)
        .await
    }

    /// Insert the user-spending row that carries apportionment and
    /// settlement for a spending. Returns its ID.
    pub async fn insert_user_spending(
        conn: &mut PgConnection,
        input: &NewUserSpending,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO user_spendings \
                 (spending_id, buyer_id, shared_with_id, takes_all, settled_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(input.spending_id)
        .bind(input.buyer_id)
        .bind(input.shared_with_id)
        .bind(input.takes_all)
        .bind(input.settled_at)
        .fetch_one(conn)
        .await
    }

    /// Link a spending to the job that produced it.
    pub async fn link_to_job(
        conn: &mut PgConnection,
        spend_job_id: DbId,
        spending_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO spend_job_spendings (spend_job_id, spending_id) VALUES ($1, $2)",
        )
        .bind(spend_job_id)
        .bind(spending_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// All spendings linked to a job, in insertion order.
    pub async fn list_for_job(
        pool: &PgPool,
        spend_job_id: DbId,
    ) -> Result<Vec<JobSpending>, sqlx::Error> {
        sqlx::query_as::<_, JobSpending>(
            "SELECT s.id AS spending_id, s.amount, s.description, s.category_id, \
                    c.name AS category_name, s.buyer_id, s.spent_on, \
                    us.shared_with_id, us.takes_all, us.settled_at \
             FROM spend_job_spendings l \
             JOIN spendings s ON s.id = l.spending_id \
             JOIN categories c ON c.id = s.category_id \
             JOIN user_spendings us ON us.spending_id = s.id \
             WHERE l.spend_job_id = $1 \
             ORDER BY s.id ASC",
        )
        .bind(spend_job_id)
        .fetch_all(pool)
        .await
    }
}
