//! User rows as seen by the pipeline: identity and settlement partner.

use duoledger_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub partner_id: Option<DbId>,
    pub created_at: Timestamp,
}
