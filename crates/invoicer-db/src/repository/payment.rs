//! # Payment Repository
//!
//! Payment records: the source of truth for an invoice's `amount_paid`.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use super::parse_money;
use crate::error::{DbError, DbResult};
use invoicer_core::ledger::total_paid;
use invoicer_core::{Money, PaymentRecord};

const PAYMENT_COLUMNS: &str = "id, invoice_id, user_id, amount, currency, payment_method, \
                               payment_date, reference, notes, created_at";

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: String,
    invoice_id: String,
    user_id: String,
    amount: String,
    currency: String,
    payment_method: String,
    payment_date: DateTime<Utc>,
    reference: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> DbResult<Self> {
        Ok(PaymentRecord {
            amount: parse_money("payment_records.amount", &row.amount)?,
            id: row.id,
            invoice_id: row.invoice_id,
            user_id: row.user_id,
            currency: row.currency,
            payment_method: row.payment_method,
            payment_date: row.payment_date,
            reference: row.reference,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

/// Read-side repository for payment records.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Gets a payment by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PaymentRecord>> {
        let sql = format!("SELECT {} FROM payment_records WHERE id = ?1", PAYMENT_COLUMNS);
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(PaymentRecord::try_from).transpose()
    }

    /// Payment history of an invoice, oldest first.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<PaymentRecord>> {
        let mut conn = self.pool.acquire().await?;
        list_for_invoice(&mut conn, invoice_id).await
    }

    /// Sum of recorded payments for an invoice.
    pub async fn total_for_invoice(&self, invoice_id: &str) -> DbResult<Money> {
        let payments = self.list_for_invoice(invoice_id).await?;
        Ok(total_paid(&payments))
    }
}

// =============================================================================
// Transaction-scoped Operations
// =============================================================================

pub(crate) async fn list_for_invoice(
    conn: &mut SqliteConnection,
    invoice_id: &str,
) -> DbResult<Vec<PaymentRecord>> {
    let sql = format!(
        "SELECT {} FROM payment_records WHERE invoice_id = ?1 ORDER BY payment_date, created_at",
        PAYMENT_COLUMNS
    );
    let rows: Vec<PaymentRow> = sqlx::query_as(&sql)
        .bind(invoice_id)
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter().map(PaymentRecord::try_from).collect()
}

pub(crate) async fn insert(conn: &mut SqliteConnection, payment: &PaymentRecord) -> DbResult<()> {
    debug!(
        invoice_id = %payment.invoice_id,
        amount = %payment.amount,
        method = %payment.payment_method,
        "Recording payment"
    );

    let sql = format!(
        "INSERT INTO payment_records ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        PAYMENT_COLUMNS
    );

    sqlx::query(&sql)
        .bind(&payment.id)
        .bind(&payment.invoice_id)
        .bind(&payment.user_id)
        .bind(payment.amount.amount().to_string())
        .bind(&payment.currency)
        .bind(&payment.payment_method)
        .bind(payment.payment_date)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub(crate) async fn delete(conn: &mut SqliteConnection, payment_id: &str) -> DbResult<()> {
    debug!(payment_id = %payment_id, "Deleting payment");

    let result = sqlx::query("DELETE FROM payment_records WHERE id = ?1")
        .bind(payment_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Payment", payment_id));
    }

    Ok(())
}
