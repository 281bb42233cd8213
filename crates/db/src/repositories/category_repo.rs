//! Repository for the `categories` catalog.

use std::collections::HashMap;

use duoledger_core::types::DbId;
use sqlx::PgPool;

use crate::models::category::Category;

/// Read access to the category catalog plus creation for seeding.
pub struct CategoryRepo;

impl CategoryRepo {
    /// All category names, alphabetically. Fed to the classification prompt.
    pub async fn list_names(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT name FROM categories ORDER BY name ASC")
            .fetch_all(pool)
            .await
    }

    /// Resolve many lowercased names in one round trip.
    ///
    /// Returns a map from lowercased name to category ID. Names that do
    /// not exist are simply absent from the map.
    pub async fn resolve_names(
        pool: &PgPool,
        lowercase_names: &[String],
    ) -> Result<HashMap<String, DbId>, sqlx::Error> {
        if lowercase_names.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (String, DbId)>(
            "SELECT LOWER(name), id FROM categories WHERE LOWER(name) = ANY($1)",
        )
        .bind(lowercase_names)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Create a category.
    pub async fn create(pool: &PgPool, name: &str) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(pool)
        .await
    }
}
