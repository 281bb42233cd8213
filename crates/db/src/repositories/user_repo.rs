//! Repository for the subset of `users` the pipeline depends on.

use duoledger_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::user::User;

/// Column list for `users` queries.
const COLUMNS: &str = "id, username, partner_id, created_at";

/// User lookup and partner resolution.
pub struct UserRepo;

impl UserRepo {
    /// Find a user, including their current settlement partner.
    ///
    /// Takes a connection so the submission transaction reads the partner
    /// it records on the job.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Create a user without a partner.
    pub async fn create(pool: &PgPool, username: &str) -> Result<User, sqlx::Error> {
        let query = format!("INSERT INTO users (username) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_one(pool)
            .await
    }

    /// Pair two users as each other's settlement partner.
    pub async fn pair(pool: &PgPool, a: DbId, b: DbId) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE users SET partner_id = $2 WHERE id = $1")
            .bind(a)
            .bind(b)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET partner_id = $2 WHERE id = $1")
            .bind(b)
            .bind(a)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
