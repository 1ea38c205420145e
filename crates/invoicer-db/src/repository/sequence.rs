//! # Invoice Sequence Repository
//!
//! Per-user invoice number counters.
//!
//! ```text
//!   INSERT INTO invoice_sequences (user_id, next_value) VALUES (?, 1)
//!   ON CONFLICT(user_id) DO UPDATE SET next_value = next_value + 1
//!   RETURNING next_value
//! ```
//!
//! The increment and the read are one statement, and it runs inside the
//! same transaction as the invoice insert. A rolled-back creation therefore
//! gives its number back.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Repository for invoice number counters.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Returns the last value handed out for the user (0 if none).
    pub async fn current(&self, user_id: &str) -> DbResult<i64> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT next_value FROM invoice_sequences WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value.unwrap_or(0))
    }

    /// Increments and returns the user's counter in its own transaction.
    pub async fn next(&self, user_id: &str) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;
        let value = next_value(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(value)
    }
}

/// Increments and returns the counter for `user_id`, starting at 1.
pub(crate) async fn next_value(conn: &mut SqliteConnection, user_id: &str) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_sequences (user_id, next_value) VALUES (?1, 1)
        ON CONFLICT(user_id) DO UPDATE SET next_value = next_value + 1
        RETURNING next_value
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    debug!(user_id = %user_id, value, "Issued invoice sequence value");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_sequence_is_per_user() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.accounts().upsert_user("user-1", None).await.unwrap();
        db.accounts().upsert_user("user-2", None).await.unwrap();

        let sequences = db.sequences();
        assert_eq!(sequences.current("user-1").await.unwrap(), 0);

        assert_eq!(sequences.next("user-1").await.unwrap(), 1);
        assert_eq!(sequences.next("user-1").await.unwrap(), 2);
        assert_eq!(sequences.next("user-2").await.unwrap(), 1);

        assert_eq!(sequences.current("user-1").await.unwrap(), 2);
    }
}
