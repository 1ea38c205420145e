//! # Account Repository
//!
//! Minimal user and client records. Invoices reference both; everything
//! else about users and clients lives outside this crate.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use invoicer_core::validation::{validate_invoice_prefix, validate_required_text};
use invoicer_core::CoreError;

/// Repository for users and clients.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Creates the user, or updates its invoice prefix.
    ///
    /// `None` keeps an existing prefix.
    pub async fn upsert_user(&self, user_id: &str, invoice_prefix: Option<&str>) -> DbResult<()> {
        validate_required_text("user_id", user_id, 64)
            .map_err(CoreError::from)?;
        if let Some(prefix) = invoice_prefix {
            validate_invoice_prefix(prefix).map_err(CoreError::from)?;
        }

        debug!(user_id = %user_id, prefix = ?invoice_prefix, "Upserting user");

        sqlx::query(
            r#"
            INSERT INTO users (id, invoice_prefix, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE
                SET invoice_prefix = COALESCE(excluded.invoice_prefix, users.invoice_prefix)
            "#,
        )
        .bind(user_id)
        .bind(invoice_prefix.map(str::trim))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Creates a client owned by `user_id`, or renames an existing one.
    pub async fn upsert_client(&self, client_id: &str, user_id: &str, name: &str) -> DbResult<()> {
        validate_required_text("name", name, 200).map_err(CoreError::from)?;

        debug!(client_id = %client_id, user_id = %user_id, "Upserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (id, user_id, name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(client_id)
        .bind(user_id)
        .bind(name.trim())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the user's own invoice prefix, if set.
    pub async fn invoice_prefix(&self, user_id: &str) -> DbResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        invoice_prefix(&mut conn, user_id).await
    }

    /// Checks that `client_id` exists and belongs to `user_id`.
    pub async fn client_belongs_to(&self, client_id: &str, user_id: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        client_belongs_to(&mut conn, client_id, user_id).await
    }
}

// =============================================================================
// Transaction-scoped Operations
// =============================================================================

/// Reads the user's invoice prefix. Fails if the user is unknown.
pub(crate) async fn invoice_prefix(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> DbResult<Option<String>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT invoice_prefix FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

    match row {
        Some((prefix,)) => Ok(prefix.filter(|p| !p.trim().is_empty())),
        None => Err(DbError::not_found("User", user_id)),
    }
}

pub(crate) async fn client_belongs_to(
    conn: &mut SqliteConnection,
    client_id: &str,
    user_id: &str,
) -> DbResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE id = ?1 AND user_id = ?2")
            .bind(client_id)
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(count > 0)
}
