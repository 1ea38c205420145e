//! # Invoice Service
//!
//! The single write path for invoices. Every operation is one SQLite
//! transaction wrapped around a pure invoicer-core operation.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    invoice  = fetch(id)                     version v                  │
//! │    payments = list_for_invoice(id)          full payment set           │
//! │    change   = core op(&mut invoice, payments, now)    ← pure           │
//! │    UPDATE invoices ... WHERE id = ? AND version = v                    │
//! │       └── 0 rows → ConcurrencyConflict                                 │
//! │    items changed?  → replace_items                                     │
//! │    change          → insert / delete payment record                    │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  conflict or lock contention → back off, re-fetch, reapply             │
//! │  (at most LedgerConfig::max_conflict_retries times)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because `amount_paid` is always recomputed from the payment set read in
//! the same transaction, two concurrent payments can never both build on the
//! same stale total: the second one conflicts and is reapplied.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{DbError, DbResult};
use crate::repository::invoice::{InvoiceFilter, InvoicePage};
use crate::repository::{account, invoice as invoices, payment as payments, sequence};
use invoicer_core::{
    format_invoice_number, revenue_by_day, CoreError, CoreResult, DailyRevenue, DashboardSummary,
    Invoice, InvoiceAction, InvoiceEdit, InvoiceView, NewInvoice, NewPayment, PaymentRecord,
};

const RETRY_BACKOFF: Duration = Duration::from_millis(5);

/// Side effect of a core operation on the payment table.
enum PaymentChange {
    Unchanged,
    Insert(PaymentRecord),
    Delete(PaymentRecord),
}

struct Mutation {
    invoice: Invoice,
    change: PaymentChange,
}

/// Invoice operations with transactional, versioned persistence.
///
/// Obtained from [`crate::Database::service`].
#[derive(Debug, Clone)]
pub struct InvoiceService {
    pool: SqlitePool,
    config: LedgerConfig,
}

impl InvoiceService {
    pub fn new(pool: SqlitePool, config: LedgerConfig) -> Self {
        InvoiceService { pool, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Creates a draft invoice with the user's next invoice number.
    ///
    /// The number is drawn in the same transaction as the insert, so a failed
    /// creation does not consume it.
    pub async fn create_invoice(&self, mut input: NewInvoice) -> DbResult<InvoiceView> {
        if input.currency.trim().is_empty() {
            input.currency = self.config.default_currency.clone();
        }

        let input = &input;
        let invoice = self
            .retrying("create", &input.user_id, move || self.try_create(input))
            .await?;

        info!(
            id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total,
            "Invoice created"
        );

        Ok(invoice.view(Utc::now()))
    }

    async fn try_create(&self, input: &NewInvoice) -> DbResult<Invoice> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Take the write lock first: the sequence bump is a write.
        let sequence = sequence::next_value(&mut tx, &input.user_id).await?;

        if !account::client_belongs_to(&mut tx, &input.client_id, &input.user_id).await? {
            return Err(DbError::not_found("Client", &input.client_id));
        }

        let prefix = account::invoice_prefix(&mut tx, &input.user_id)
            .await?
            .unwrap_or_else(|| self.config.default_invoice_prefix.clone());
        let number = format_invoice_number(&prefix, sequence);

        let invoice = Invoice::create(input.clone(), number, now)?;
        invoices::insert(&mut tx, &invoice).await?;

        tx.commit().await?;
        Ok(invoice)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets one of the user's invoices.
    pub async fn get_invoice(&self, user_id: &str, invoice_id: &str) -> DbResult<InvoiceView> {
        let mut conn = self.pool.acquire().await?;
        let invoice = invoices::fetch(&mut conn, invoice_id)
            .await?
            .filter(|invoice| invoice.user_id == user_id)
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        Ok(invoice.view(Utc::now()))
    }

    /// Lists the user's invoices by effective status and client.
    pub async fn list_invoices(&self, filter: &InvoiceFilter) -> DbResult<InvoicePage> {
        let mut conn = self.pool.acquire().await?;
        invoices::list(&mut conn, filter, Utc::now()).await
    }

    /// Revenue and receivables for the user's dashboard.
    pub async fn dashboard(&self, user_id: &str) -> DbResult<DashboardSummary> {
        let mut conn = self.pool.acquire().await?;
        let all = invoices::list_for_user(&mut conn, user_id).await?;
        Ok(DashboardSummary::compute(&all, Utc::now()))
    }

    /// Daily paid revenue over the last `days` days, oldest first.
    pub async fn revenue_by_day(&self, user_id: &str, days: u32) -> DbResult<Vec<DailyRevenue>> {
        let mut conn = self.pool.acquire().await?;
        let all = invoices::list_for_user(&mut conn, user_id).await?;
        let since = Utc::now() - chrono::Duration::days(i64::from(days));
        Ok(revenue_by_day(&all, since))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Edits a draft, or the notes/terms of a sent invoice.
    pub async fn edit_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
        edit: InvoiceEdit,
    ) -> DbResult<InvoiceView> {
        if let Some(client_id) = &edit.client_id {
            let mut conn = self.pool.acquire().await?;
            if !account::client_belongs_to(&mut conn, client_id, user_id).await? {
                return Err(DbError::not_found("Client", client_id));
            }
        }

        let edit = &edit;
        self.mutate(Some(user_id), invoice_id, InvoiceAction::Edit, move |invoice, _, now| {
            invoice.edit(edit.clone(), now)?;
            Ok(PaymentChange::Unchanged)
        })
        .await
        .map(|m| m.invoice.view(Utc::now()))
    }

    pub async fn send_invoice(&self, user_id: &str, invoice_id: &str) -> DbResult<InvoiceView> {
        self.mutate(Some(user_id), invoice_id, InvoiceAction::Send, |invoice, _, now| {
            invoice.send(now)?;
            Ok(PaymentChange::Unchanged)
        })
        .await
        .map(|m| m.invoice.view(Utc::now()))
    }

    /// Records a view from the client's public link. Not scoped to a user.
    pub async fn mark_viewed(&self, invoice_id: &str) -> DbResult<InvoiceView> {
        self.mutate(None, invoice_id, InvoiceAction::MarkViewed, |invoice, _, now| {
            invoice.mark_viewed(now)?;
            Ok(PaymentChange::Unchanged)
        })
        .await
        .map(|m| m.invoice.view(Utc::now()))
    }

    /// Records a payment; returns the updated invoice and the new record.
    pub async fn record_payment(
        &self,
        user_id: &str,
        invoice_id: &str,
        payment: NewPayment,
    ) -> DbResult<(InvoiceView, PaymentRecord)> {
        let payment = &payment;
        let mutation = self
            .mutate(
                Some(user_id),
                invoice_id,
                InvoiceAction::RecordPayment,
                move |invoice, payments, now| {
                    invoice
                        .record_payment(payments, payment.clone(), now)
                        .map(PaymentChange::Insert)
                },
            )
            .await?;

        match mutation.change {
            PaymentChange::Insert(record) => Ok((mutation.invoice.view(Utc::now()), record)),
            _ => Err(DbError::Internal("payment was not recorded".to_string())),
        }
    }

    /// Deletes a payment and recomputes the paid state without it.
    pub async fn delete_payment(
        &self,
        user_id: &str,
        invoice_id: &str,
        payment_id: &str,
    ) -> DbResult<InvoiceView> {
        self.mutate(
            Some(user_id),
            invoice_id,
            InvoiceAction::ReversePayment,
            move |invoice, payments, now| {
                invoice
                    .reverse_payment(payments, payment_id, now)
                    .map(PaymentChange::Delete)
            },
        )
        .await
        .map(|m| m.invoice.view(Utc::now()))
    }

    /// Marks the invoice paid without recording a payment.
    pub async fn mark_paid(&self, user_id: &str, invoice_id: &str) -> DbResult<InvoiceView> {
        self.mutate(Some(user_id), invoice_id, InvoiceAction::MarkPaid, |invoice, _, now| {
            invoice.mark_paid_manually(now)?;
            Ok(PaymentChange::Unchanged)
        })
        .await
        .map(|m| m.invoice.view(Utc::now()))
    }

    pub async fn cancel_invoice(&self, user_id: &str, invoice_id: &str) -> DbResult<InvoiceView> {
        self.mutate(Some(user_id), invoice_id, InvoiceAction::Cancel, |invoice, _, now| {
            invoice.cancel(now)?;
            Ok(PaymentChange::Unchanged)
        })
        .await
        .map(|m| m.invoice.view(Utc::now()))
    }

    // =========================================================================
    // Transaction Plumbing
    // =========================================================================

    async fn mutate<F>(
        &self,
        owner: Option<&str>,
        invoice_id: &str,
        action: InvoiceAction,
        op: F,
    ) -> DbResult<Mutation>
    where
        F: Fn(&mut Invoice, &[PaymentRecord], DateTime<Utc>) -> CoreResult<PaymentChange>
            + Send
            + Sync,
    {
        let op = &op;
        let mutation = self
            .retrying(&action.to_string(), invoice_id, move || {
                self.try_mutate(owner, invoice_id, op)
            })
            .await?;

        info!(
            id = %invoice_id,
            action = %action,
            status = %mutation.invoice.status,
            version = mutation.invoice.version,
            "Invoice updated"
        );

        Ok(mutation)
    }

    async fn try_mutate<F>(&self, owner: Option<&str>, invoice_id: &str, op: &F) -> DbResult<Mutation>
    where
        F: Fn(&mut Invoice, &[PaymentRecord], DateTime<Utc>) -> CoreResult<PaymentChange>,
    {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut invoice = invoices::fetch(&mut tx, invoice_id)
            .await?
            .filter(|invoice| owner.map_or(true, |owner| invoice.user_id == owner))
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;
        let history = payments::list_for_invoice(&mut tx, invoice_id).await?;

        let expected_version = invoice.version;
        let items_before = invoice.items.clone();

        let change = op(&mut invoice, &history, now)?;

        if !invoices::update_versioned(&mut tx, &invoice, expected_version).await? {
            return Err(CoreError::ConcurrencyConflict {
                invoice_id: invoice_id.to_string(),
            }
            .into());
        }

        if invoice.items != items_before {
            invoices::replace_items(&mut tx, invoice_id, &invoice.items).await?;
        }

        match &change {
            PaymentChange::Insert(record) => payments::insert(&mut tx, record).await?,
            PaymentChange::Delete(record) => payments::delete(&mut tx, &record.id).await?,
            PaymentChange::Unchanged => {}
        }

        tx.commit().await?;

        invoice.version = expected_version + 1;
        Ok(Mutation { invoice, change })
    }

    /// Runs `attempt` until it succeeds, fails for a non-conflict reason, or
    /// the retry budget is spent.
    async fn retrying<T, Fut>(
        &self,
        action: &str,
        subject: &str,
        mut attempt: impl FnMut() -> Fut,
    ) -> DbResult<T>
    where
        Fut: Future<Output = DbResult<T>>,
    {
        let mut retries = 0;

        loop {
            match attempt().await {
                Err(err) if err.is_conflict() && retries < self.config.max_conflict_retries => {
                    retries += 1;
                    warn!(
                        subject = %subject,
                        action = %action,
                        retry = retries,
                        error = %err,
                        "Conflict, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * retries).await;
                }
                Err(err) => {
                    debug!(subject = %subject, action = %action, error = %err, "Invoice operation failed");
                    return Err(err);
                }
                Ok(value) => return Ok(value),
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
