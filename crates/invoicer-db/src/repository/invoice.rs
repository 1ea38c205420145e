//! # Invoice Repository
//!
//! Database operations for invoices and their line items.
//!
//! ## Versioned Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  fetch ──► invoice { version: 7 }                                      │
//! │                │                                                        │
//! │                ▼  core operation                                        │
//! │  UPDATE invoices SET ..., version = version + 1                        │
//! │  WHERE id = ? AND version = 7                                          │
//! │                │                                                        │
//! │                ├── 1 row  → committed, now version 8                   │
//! │                └── 0 rows → someone else wrote first: conflict         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes only happen through [`crate::InvoiceService`]; the pool-backed
//! [`InvoiceRepository`] is read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use super::{parse_decimal, parse_money, parse_percent};
use crate::error::DbResult;
use invoicer_core::{Invoice, InvoiceStatus, InvoiceView, LineItem};

const INVOICE_COLUMNS: &str = r#"
    id, user_id, client_id, invoice_number, status,
    issue_date, due_date, paid_date,
    subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total, amount_paid,
    payment_method, currency, notes, terms,
    sent_at, view_count, last_viewed_at, status_before_paid,
    version, created_at, updated_at
"#;

/// Page size used when the filter does not set one.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    user_id: String,
    client_id: String,
    invoice_number: String,
    status: InvoiceStatus,
    issue_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    paid_date: Option<DateTime<Utc>>,
    subtotal: String,
    tax_rate: String,
    tax_amount: String,
    discount_rate: String,
    discount_amount: String,
    total: String,
    amount_paid: String,
    payment_method: Option<String>,
    currency: String,
    notes: Option<String>,
    terms: Option<String>,
    sent_at: Option<DateTime<Utc>>,
    view_count: i64,
    last_viewed_at: Option<DateTime<Utc>>,
    status_before_paid: Option<InvoiceStatus>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self, items: Vec<LineItem>) -> DbResult<Invoice> {
        Ok(Invoice {
            subtotal: parse_money("subtotal", &self.subtotal)?,
            tax_rate: parse_percent("tax_rate", &self.tax_rate)?,
            tax_amount: parse_money("tax_amount", &self.tax_amount)?,
            discount_rate: parse_percent("discount_rate", &self.discount_rate)?,
            discount_amount: parse_money("discount_amount", &self.discount_amount)?,
            total: parse_money("total", &self.total)?,
            amount_paid: parse_money("amount_paid", &self.amount_paid)?,
            id: self.id,
            user_id: self.user_id,
            client_id: self.client_id,
            invoice_number: self.invoice_number,
            status: self.status,
            issue_date: self.issue_date,
            due_date: self.due_date,
            paid_date: self.paid_date,
            items,
            payment_method: self.payment_method,
            currency: self.currency,
            notes: self.notes,
            terms: self.terms,
            sent_at: self.sent_at,
            view_count: self.view_count,
            last_viewed_at: self.last_viewed_at,
            status_before_paid: self.status_before_paid,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    invoice_id: String,
    description: String,
    quantity: String,
    unit_price: String,
    amount: String,
    tax_rate: Option<String>,
    sort_order: i64,
}

impl ItemRow {
    fn into_item(self) -> DbResult<(String, LineItem)> {
        let tax_rate = match self.tax_rate.as_deref() {
            Some(rate) => Some(parse_percent("invoice_items.tax_rate", rate)?),
            None => None,
        };

        let item = LineItem {
            description: self.description,
            quantity: parse_decimal("quantity", &self.quantity)?,
            unit_price: parse_money("unit_price", &self.unit_price)?,
            amount: parse_money("amount", &self.amount)?,
            tax_rate,
            sort_order: self.sort_order,
        };

        Ok((self.invoice_id, item))
    }
}

// =============================================================================
// Filtering
// =============================================================================

/// Listing criteria. Always scoped to one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFilter {
    pub user_id: String,
    /// Matched against the effective status, so `Overdue` finds sent and
    /// viewed invoices past their due date.
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<String>,
    /// Clamped to `1..=MAX_PAGE_SIZE`.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl InvoiceFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        InvoiceFilter {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn status(mut self, status: InvoiceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Sqlite>, now: DateTime<Utc>) {
        qb.push(" WHERE user_id = ").push_bind(self.user_id.clone());

        if let Some(client_id) = &self.client_id {
            qb.push(" AND client_id = ").push_bind(client_id.clone());
        }

        match self.status {
            Some(InvoiceStatus::Overdue) => {
                qb.push(" AND status IN ('sent', 'viewed') AND due_date < ")
                    .push_bind(now);
            }
            Some(status @ (InvoiceStatus::Sent | InvoiceStatus::Viewed)) => {
                qb.push(" AND status = ")
                    .push_bind(status)
                    .push(" AND due_date >= ")
                    .push_bind(now);
            }
            Some(status) => {
                qb.push(" AND status = ").push_bind(status);
            }
            None => {}
        }
    }
}

/// One page of invoices, as seen at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePage {
    pub invoices: Vec<InvoiceView>,
    /// Matching invoices across all pages.
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl InvoicePage {
    pub fn has_more(&self) -> bool {
        self.offset + (self.invoices.len() as i64) < self.total
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Read-side repository for invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice with its items by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Lists invoices matching `filter`, newest first.
    pub async fn list(&self, filter: &InvoiceFilter, now: DateTime<Utc>) -> DbResult<InvoicePage> {
        let mut conn = self.pool.acquire().await?;
        list(&mut conn, filter, now).await
    }

    /// Every invoice of a user, with items.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        list_for_user(&mut conn, user_id).await
    }

    /// Counts a user's invoices.
    pub async fn count(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-scoped Operations
// =============================================================================

/// Loads one invoice and its items.
pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
    let sql = format!("SELECT {} FROM invoices WHERE id = ?1", INVOICE_COLUMNS);
    let row: Option<InvoiceRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(attach_items(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

pub(crate) async fn list(
    conn: &mut SqliteConnection,
    filter: &InvoiceFilter,
    now: DateTime<Utc>,
) -> DbResult<InvoicePage> {
    let limit = filter.effective_limit();
    let offset = filter.effective_offset();

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM invoices");
    filter.push_conditions(&mut count_qb, now);
    let total: i64 = count_qb
        .build_query_scalar::<i64>()
        .fetch_one(&mut *conn)
        .await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM invoices", INVOICE_COLUMNS));
    filter.push_conditions(&mut qb, now);
    qb.push(" ORDER BY created_at DESC, invoice_number DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<InvoiceRow> = qb.build_query_as::<InvoiceRow>().fetch_all(&mut *conn).await?;
    let invoices = attach_items(conn, rows).await?;

    debug!(user_id = %filter.user_id, total, returned = invoices.len(), "Listed invoices");

    Ok(InvoicePage {
        invoices: invoices.iter().map(|invoice| invoice.view(now)).collect(),
        total,
        limit,
        offset,
    })
}

pub(crate) async fn list_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> DbResult<Vec<Invoice>> {
    let sql = format!(
        "SELECT {} FROM invoices WHERE user_id = ?1 ORDER BY created_at",
        INVOICE_COLUMNS
    );
    let rows: Vec<InvoiceRow> = sqlx::query_as(&sql)
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

    attach_items(conn, rows).await
}

/// Loads the items of every row in one query and builds the invoices.
async fn attach_items(conn: &mut SqliteConnection, rows: Vec<InvoiceRow>) -> DbResult<Vec<Invoice>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT invoice_id, description, quantity, unit_price, amount, tax_rate, sort_order \
         FROM invoice_items WHERE invoice_id IN (",
    );
    let mut ids = qb.separated(", ");
    for row in &rows {
        ids.push_bind(row.id.clone());
    }
    qb.push(") ORDER BY invoice_id, sort_order, id");

    let item_rows: Vec<ItemRow> = qb.build_query_as::<ItemRow>().fetch_all(&mut *conn).await?;

    let mut items_by_invoice: HashMap<String, Vec<LineItem>> = HashMap::new();
    for item_row in item_rows {
        let (invoice_id, item) = item_row.into_item()?;
        items_by_invoice.entry(invoice_id).or_default().push(item);
    }

    rows.into_iter()
        .map(|row| {
            let items = items_by_invoice.remove(&row.id).unwrap_or_default();
            row.into_invoice(items)
        })
        .collect()
}

/// Inserts a new invoice and its items.
pub(crate) async fn insert(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    debug!(id = %invoice.id, invoice_number = %invoice.invoice_number, "Inserting invoice");

    let sql = format!(
        "INSERT INTO invoices ({}) VALUES (\
         ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
         ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)",
        INVOICE_COLUMNS
    );

    sqlx::query(&sql)
        .bind(&invoice.id)
        .bind(&invoice.user_id)
        .bind(&invoice.client_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.status)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.paid_date)
        .bind(invoice.subtotal.amount().to_string())
        .bind(invoice.tax_rate.value().to_string())
        .bind(invoice.tax_amount.amount().to_string())
        .bind(invoice.discount_rate.value().to_string())
        .bind(invoice.discount_amount.amount().to_string())
        .bind(invoice.total.amount().to_string())
        .bind(invoice.amount_paid.amount().to_string())
        .bind(&invoice.payment_method)
        .bind(&invoice.currency)
        .bind(&invoice.notes)
        .bind(&invoice.terms)
        .bind(invoice.sent_at)
        .bind(invoice.view_count)
        .bind(invoice.last_viewed_at)
        .bind(invoice.status_before_paid)
        .bind(invoice.version)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await?;

    insert_items(conn, &invoice.id, &invoice.items).await
}

/// Writes every mutable column if the stored version still matches.
///
/// Returns `false` when another writer got there first. On success the
/// stored version becomes `expected_version + 1`.
pub(crate) async fn update_versioned(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
    expected_version: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE invoices SET
            client_id = ?3,
            status = ?4,
            issue_date = ?5,
            due_date = ?6,
            paid_date = ?7,
            subtotal = ?8,
            tax_rate = ?9,
            tax_amount = ?10,
            discount_rate = ?11,
            discount_amount = ?12,
            total = ?13,
            amount_paid = ?14,
            payment_method = ?15,
            currency = ?16,
            notes = ?17,
            terms = ?18,
            sent_at = ?19,
            view_count = ?20,
            last_viewed_at = ?21,
            status_before_paid = ?22,
            updated_at = ?23,
            version = version + 1
        WHERE id = ?1 AND version = ?2
        "#,
    )
    .bind(&invoice.id)
    .bind(expected_version)
    .bind(&invoice.client_id)
    .bind(invoice.status)
    .bind(invoice.issue_date)
    .bind(invoice.due_date)
    .bind(invoice.paid_date)
    .bind(invoice.subtotal.amount().to_string())
    .bind(invoice.tax_rate.value().to_string())
    .bind(invoice.tax_amount.amount().to_string())
    .bind(invoice.discount_rate.value().to_string())
    .bind(invoice.discount_amount.amount().to_string())
    .bind(invoice.total.amount().to_string())
    .bind(invoice.amount_paid.amount().to_string())
    .bind(&invoice.payment_method)
    .bind(&invoice.currency)
    .bind(&invoice.notes)
    .bind(&invoice.terms)
    .bind(invoice.sent_at)
    .bind(invoice.view_count)
    .bind(invoice.last_viewed_at)
    .bind(invoice.status_before_paid)
    .bind(invoice.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Replaces all items of an invoice.
pub(crate) async fn replace_items(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    items: &[LineItem],
) -> DbResult<()> {
    sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;

    insert_items(conn, invoice_id, items).await
}

async fn insert_items(conn: &mut SqliteConnection, invoice_id: &str, items: &[LineItem]) -> DbResult<()> {
    for item in items {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (
                invoice_id, description, quantity, unit_price, amount, tax_rate, sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(invoice_id)
        .bind(&item.description)
        .bind(item.quantity.to_string())
        .bind(item.unit_price.amount().to_string())
        .bind(item.amount.amount().to_string())
        .bind(item.tax_rate.map(|rate| rate.value().to_string()))
        .bind(item.sort_order)
        .execute(&mut *conn)
        .await?;
    }

    debug!(invoice_id = %invoice_id, count = items.len(), "Wrote invoice items");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use invoicer_core::{Money, NewInvoice, Percent};
    use rust_decimal_macros::dec;

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.accounts().upsert_user("user-1", None).await.unwrap();
        db.accounts()
            .upsert_client("client-1", "user-1", "Acme Corp")
            .await
            .unwrap();
        db
    }

    fn draft(number: &str, due_in_days: i64) -> Invoice {
        let now = Utc::now();
        let input = NewInvoice {
            user_id: "user-1".to_string(),
            client_id: "client-1".to_string(),
            issue_date: now,
            due_date: now + Duration::days(due_in_days),
            items: vec![
                LineItem::from_quantity("Design", dec!(2.5), Money::from_major(100)),
                LineItem::from_quantity("Hosting", dec!(1), Money::from_decimal(dec!(19.99))),
            ],
            tax_rate: Percent::new(dec!(8.25)),
            discount_rate: Percent::zero(),
            currency: "USD".to_string(),
            notes: Some("Thanks".to_string()),
            terms: None,
        };
        Invoice::create(input, number.to_string(), now).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_fetch_roundtrip() {
        let db = setup().await;
        let invoice = draft("INV-0001", 30);

        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &invoice).await.unwrap();
        drop(conn);

        let loaded = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(loaded.items, invoice.items);
        assert_eq!(loaded.total, invoice.total);
        assert_eq!(loaded.tax_amount.amount(), invoice.tax_amount.amount());
        assert_eq!(loaded.tax_rate, invoice.tax_rate);
        assert_eq!(loaded.status, InvoiceStatus::Draft);
        assert_eq!(loaded.notes.as_deref(), Some("Thanks"));

        assert!(db.invoices().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        insert(&mut conn, &draft("INV-0001", 30)).await.unwrap();
        let err = insert(&mut conn, &draft("INV-0001", 30)).await.unwrap_err();
        assert!(matches!(err, crate::DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let db = setup().await;
        let mut invoice = draft("INV-0001", 30);
        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &invoice).await.unwrap();

        invoice.notes = Some("first".to_string());
        assert!(update_versioned(&mut conn, &invoice, 0).await.unwrap());

        invoice.notes = Some("stale".to_string());
        assert!(!update_versioned(&mut conn, &invoice, 0).await.unwrap());

        let loaded = fetch(&mut conn, &invoice.id).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.notes.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_list_filters_by_effective_status() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let mut late = draft("INV-0001", -5);
        late.send(Utc::now()).unwrap();
        let mut current = draft("INV-0002", 10);
        current.send(Utc::now()).unwrap();
        let pending = draft("INV-0003", 10);

        for invoice in [&late, &current, &pending] {
            insert(&mut conn, invoice).await.unwrap();
        }
        drop(conn);

        let now = Utc::now();
        let repo = db.invoices();

        let overdue = repo
            .list(&InvoiceFilter::for_user("user-1").status(InvoiceStatus::Overdue), now)
            .await
            .unwrap();
        assert_eq!(overdue.total, 1);
        assert_eq!(overdue.invoices[0].invoice.id, late.id);
        assert_eq!(overdue.invoices[0].status, InvoiceStatus::Overdue);

        let sent = repo
            .list(&InvoiceFilter::for_user("user-1").status(InvoiceStatus::Sent), now)
            .await
            .unwrap();
        assert_eq!(sent.total, 1);
        assert_eq!(sent.invoices[0].invoice.id, current.id);

        let all = repo.list(&InvoiceFilter::for_user("user-1"), now).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.invoices[0].invoice.items.len(), 2);

        let other_client = repo
            .list(&InvoiceFilter::for_user("user-1").client("client-2"), now)
            .await
            .unwrap();
        assert_eq!(other_client.total, 0);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        for n in 1..=5 {
            insert(&mut conn, &draft(&format!("INV-{:04}", n), 30)).await.unwrap();
        }
        drop(conn);

        let page = db
            .invoices()
            .list(&InvoiceFilter::for_user("user-1").page(2, 0), Utc::now())
            .await
            .unwrap();
        assert_eq!(page.invoices.len(), 2);
        assert_eq!(page.total, 5);
        assert!(page.has_more());

        let last = db
            .invoices()
            .list(&InvoiceFilter::for_user("user-1").page(2, 4), Utc::now())
            .await
            .unwrap();
        assert_eq!(last.invoices.len(), 1);
        assert!(!last.has_more());

        let clamped = InvoiceFilter::for_user("user-1").page(10_000, -3);
        assert_eq!(clamped.effective_limit(), MAX_PAGE_SIZE);
        assert_eq!(clamped.effective_offset(), 0);

        assert_eq!(db.invoices().count("user-1").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_replace_items() {
        let db = setup().await;
        let invoice = draft("INV-0001", 30);
        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &invoice).await.unwrap();

        let replacement = vec![LineItem::from_quantity("Audit", dec!(1), Money::from_major(500))];
        replace_items(&mut conn, &invoice.id, &replacement).await.unwrap();

        let loaded = fetch(&mut conn, &invoice.id).await.unwrap().unwrap();
        assert_eq!(loaded.items, replacement);
    }
}
