//! # Domain Types
//!
//! Core domain types used throughout Invoicer.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Invoice      │   │    LineItem     │   │  PaymentRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  description    │   │  id (UUID)      │       │
//! │  │  invoice_number │   │  quantity       │   │  invoice_id(FK) │       │
//! │  │  status         │   │  unit_price     │   │  amount         │       │
//! │  │  totals         │   │  amount         │   │  payment_method │       │
//! │  │  amount_paid    │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Percent      │   │  InvoiceStatus  │   │  InvoiceAction  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  8.25 = 8.25%   │   │  Draft, Sent,   │   │  Send, Cancel,  │       │
//! │  │  range [0, 100] │   │  Viewed, Paid,  │   │  RecordPayment, │       │
//! │  └─────────────────┘   │  Overdue,       │   │  ...            │       │
//! │                        │  Canceled       │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every invoice has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `invoice_number`: `INV-0042` - human-readable, sequential per user

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Percent
// =============================================================================

/// A rate expressed as a percentage: `Percent::from_whole(10)` is 10%.
///
/// Tax and discount rates must lie in `[0, 100]`; the calculator rejects
/// anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Percent(value)
    }

    /// Creates a whole-number percentage.
    pub fn from_whole(value: u32) -> Self {
        Percent(Decimal::from(value))
    }

    /// Returns the percentage value (10 for 10%).
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percent(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks the `[0, 100]` bound.
    pub fn is_valid_rate(&self) -> bool {
        self.0 >= Decimal::ZERO && self.0 <= Decimal::ONE_HUNDRED
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl FromStr for Percent {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Percent)
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Lifecycle status of an invoice.
///
/// ```text
///   draft ──send──► sent ──view──► viewed
///     │              │  ╲            │
///     │              │   ╲ (due date passes: reported as overdue)
///     │              ▼    ╲          ▼
///     │            paid ◄──────── payments / mark paid
///     │
///     └──── cancel (from any non-terminal state) ────► canceled
/// ```
///
/// `Overdue` is never stored by the lifecycle: it is derived at read time
/// from `due_date`. It exists as a variant so views and filters can carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Being prepared; the only state where money fields can change.
    Draft,
    /// Delivered to the client.
    Sent,
    /// Opened by the client.
    Viewed,
    /// Fully settled. Terminal.
    Paid,
    /// Sent or viewed, and past its due date.
    Overdue,
    /// Voided by the issuer. Terminal.
    Canceled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 6] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Viewed,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Canceled => "canceled",
        }
    }

    /// Paid and canceled invoices accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Canceled)
    }

    /// Statuses that still expect money from the client.
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::Viewed | InvoiceStatus::Overdue
        )
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Reversing a payment out of `paid` is a ledger correction, not a
    /// lifecycle transition, so it is not listed here.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;

        match (self, next) {
            (Draft, Sent) => true,
            (Sent, Viewed) => true,
            (Sent | Viewed, Overdue) => true,
            (Draft | Sent | Viewed | Overdue, Paid) => true,
            (Draft | Sent | Viewed | Overdue, Canceled) => true,
            _ => false,
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown invoice status '{}'", s),
            })
    }
}

// =============================================================================
// Invoice Action
// =============================================================================

/// The operations a caller can request on an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceAction {
    Send,
    MarkViewed,
    RecordPayment,
    ReversePayment,
    MarkPaid,
    Cancel,
    Edit,
}

impl fmt::Display for InvoiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InvoiceAction::Send => "send",
            InvoiceAction::MarkViewed => "mark viewed",
            InvoiceAction::RecordPayment => "record payment",
            InvoiceAction::ReversePayment => "reverse payment",
            InvoiceAction::MarkPaid => "mark paid",
            InvoiceAction::Cancel => "cancel",
            InvoiceAction::Edit => "edit",
        };
        f.write_str(label)
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One billable row of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub description: String,
    /// Units billed; may be fractional (e.g. 2.5 hours).
    #[ts(as = "String")]
    pub quantity: Decimal,
    #[ts(as = "String")]
    pub unit_price: Money,
    /// Line total. Authoritative: normally `quantity × unit_price`, but
    /// callers may override it.
    #[ts(as = "String")]
    pub amount: Money,
    /// Informational per-line rate, shown on the document only.
    #[ts(as = "Option<String>")]
    pub tax_rate: Option<Percent>,
    /// Display position within the invoice.
    pub sort_order: i64,
}

impl LineItem {
    /// Builds a line whose amount is `quantity × unit_price`.
    pub fn from_quantity(description: impl Into<String>, quantity: Decimal, unit_price: Money) -> Self {
        LineItem {
            description: description.into(),
            quantity,
            unit_price,
            amount: unit_price.multiply_quantity(quantity),
            tax_rate: None,
            sort_order: 0,
        }
    }

    /// Overrides the computed line total.
    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A billing document for one client.
///
/// Money fields are derived by [`crate::calculator::compute_totals`] and the
/// payment ledger; status changes go through the lifecycle methods in
/// [`crate::lifecycle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// Issuer.
    pub user_id: String,
    /// Payer.
    pub client_id: String,
    /// Human-readable number, unique per user (`INV-0001`).
    pub invoice_number: String,
    /// Stored status; see [`Invoice::effective_status`] for the reported one.
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub issue_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub due_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_date: Option<DateTime<Utc>>,
    pub items: Vec<LineItem>,
    #[ts(as = "String")]
    pub subtotal: Money,
    #[ts(as = "String")]
    pub tax_rate: Percent,
    #[ts(as = "String")]
    pub tax_amount: Money,
    #[ts(as = "String")]
    pub discount_rate: Percent,
    #[ts(as = "String")]
    pub discount_amount: Money,
    #[ts(as = "String")]
    pub total: Money,
    /// Sum of recorded payments (or `total` after a manual mark-paid).
    #[ts(as = "String")]
    pub amount_paid: Money,
    /// Method of the first recorded payment.
    pub payment_method: Option<String>,
    /// ISO-4217 code.
    pub currency: String,
    pub notes: Option<String>,
    pub terms: Option<String>,
    #[ts(as = "Option<String>")]
    pub sent_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    #[ts(as = "Option<String>")]
    pub last_viewed_at: Option<DateTime<Utc>>,
    /// Status the invoice held when it entered `paid`, restored when a
    /// payment reversal takes it back out.
    pub status_before_paid: Option<InvoiceStatus>,
    /// Optimistic concurrency token, bumped by storage on every write.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a draft invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewInvoice {
    pub user_id: String,
    pub client_id: String,
    #[ts(as = "String")]
    pub issue_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub due_date: DateTime<Utc>,
    pub items: Vec<LineItem>,
    #[ts(as = "String")]
    pub tax_rate: Percent,
    #[ts(as = "String")]
    pub discount_rate: Percent,
    pub currency: String,
    pub notes: Option<String>,
    pub terms: Option<String>,
}

/// A partial update of an invoice.
///
/// `None` leaves a field untouched. Everything except `notes` and `terms`
/// is a monetary/document field and is only editable while `draft`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceEdit {
    pub client_id: Option<String>,
    pub items: Option<Vec<LineItem>>,
    #[ts(as = "Option<String>")]
    pub tax_rate: Option<Percent>,
    #[ts(as = "Option<String>")]
    pub discount_rate: Option<Percent>,
    pub currency: Option<String>,
    #[ts(as = "Option<String>")]
    pub issue_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub terms: Option<String>,
}

impl InvoiceEdit {
    /// True when the edit touches anything besides notes and terms.
    pub fn touches_document(&self) -> bool {
        self.client_id.is_some()
            || self.items.is_some()
            || self.tax_rate.is_some()
            || self.discount_rate.is_some()
            || self.currency.is_some()
            || self.issue_date.is_some()
            || self.due_date.is_some()
    }

    /// True when totals must be recomputed.
    pub fn touches_totals(&self) -> bool {
        self.items.is_some() || self.tax_rate.is_some() || self.discount_rate.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.touches_document() && self.notes.is_none() && self.terms.is_none()
    }
}

// =============================================================================
// Payment Record
// =============================================================================

/// One inbound payment recorded against an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentRecord {
    pub id: String,
    pub invoice_id: String,
    pub user_id: String,
    #[ts(as = "String")]
    pub amount: Money,
    pub currency: String,
    /// Free-form method: `bank_transfer`, `cash`, `paypal`, ...
    pub payment_method: String,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
    /// Check number, transaction id, etc.
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for recording a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPayment {
    #[ts(as = "String")]
    pub amount: Money,
    pub payment_method: String,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Invoice View
// =============================================================================

/// What callers see when they read an invoice: the stored record plus the
/// values derived at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceView {
    pub invoice: Invoice,
    /// `overdue` when the stored status is sent/viewed and the due date passed.
    pub status: InvoiceStatus,
    /// `total - amount_paid`, never negative.
    #[ts(as = "String")]
    pub balance_due: Money,
    /// Amount paid beyond the total.
    #[ts(as = "String")]
    pub credit_balance: Money,
    /// Whole days until the due date (negative once late), rounded up.
    pub days_until_due: i64,
}

// =============================================================================
// Invoice Numbers
// =============================================================================

/// Formats a per-user sequence value as an invoice number.
///
/// ```rust
/// use invoicer_core::types::format_invoice_number;
///
/// assert_eq!(format_invoice_number("INV", 7), "INV-0007");
/// assert_eq!(format_invoice_number("", 12345), "INV-12345");
/// ```
pub fn format_invoice_number(prefix: &str, sequence: i64) -> String {
    let prefix = prefix.trim();
    let prefix = if prefix.is_empty() {
        crate::DEFAULT_INVOICE_PREFIX
    } else {
        prefix
    };
    format!("{}-{:04}", prefix, sequence)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_bounds() {
        assert!(Percent::from_whole(0).is_valid_rate());
        assert!(Percent::from_whole(100).is_valid_rate());
        assert!(Percent::new(dec!(8.25)).is_valid_rate());
        assert!(!Percent::new(dec!(100.01)).is_valid_rate());
        assert!(!Percent::new(dec!(-1)).is_valid_rate());
        assert_eq!(Percent::new(dec!(8.250)).to_string(), "8.25%");
    }

    #[test]
    fn test_status_roundtrips_through_str() {
        for status in InvoiceStatus::ALL {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
        }
        assert!("archived".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&InvoiceStatus::Canceled).unwrap();
        assert_eq!(json, "\"canceled\"");
    }

    #[test]
    fn test_terminal_states_have_no_transitions() {
        for terminal in [InvoiceStatus::Paid, InvoiceStatus::Canceled] {
            assert!(terminal.is_terminal());
            for next in InvoiceStatus::ALL {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_transition_table() {
        assert!(InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Sent));
        assert!(!InvoiceStatus::Sent.can_transition_to(InvoiceStatus::Sent));
        assert!(!InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Viewed));
        assert!(InvoiceStatus::Viewed.can_transition_to(InvoiceStatus::Canceled));
        assert!(!InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Overdue));
    }

    #[test]
    fn test_line_item_from_quantity() {
        let item = LineItem::from_quantity("Design work", dec!(10), Money::from_major(100));
        assert_eq!(item.amount, Money::from_major(1000));

        let overridden = item.with_amount(Money::from_major(900));
        assert_eq!(overridden.amount, Money::from_major(900));
    }

    #[test]
    fn test_edit_classification() {
        let notes_only = InvoiceEdit {
            notes: Some("Thanks!".to_string()),
            ..Default::default()
        };
        assert!(!notes_only.touches_document());
        assert!(!notes_only.is_empty());

        let rates = InvoiceEdit {
            tax_rate: Some(Percent::from_whole(5)),
            ..Default::default()
        };
        assert!(rates.touches_document());
        assert!(rates.touches_totals());

        assert!(InvoiceEdit::default().is_empty());
    }

    #[test]
    fn test_format_invoice_number() {
        assert_eq!(format_invoice_number("INV", 1), "INV-0001");
        assert_eq!(format_invoice_number("ACME", 42), "ACME-0042");
        assert_eq!(format_invoice_number("  ", 3), "INV-0003");
    }
}
