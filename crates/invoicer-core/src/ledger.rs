//! # Payment Ledger
//!
//! Turns an invoice's payment history into its paid state.
//!
//! ## Recompute, Never Accumulate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   payments[]  ──► Σ amount ──► amount_paid ──► status / paid_date       │
//! │       ▲                                                                 │
//! │       │  + new payment   (apply_payment)                                │
//! │       │  − removed one   (reverse_payment)                              │
//! │                                                                         │
//! │   amount_paid is always derived from the FULL current payment set,     │
//! │   so a lost increment can never drift the stored figure.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions here are pure: they return a [`LedgerOutcome`] and leave the
//! invoice untouched. The lifecycle applies the outcome.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus, NewPayment, PaymentRecord};
use crate::validation::validate_new_payment;

/// The paid state of an invoice after a ledger operation.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerOutcome {
    pub amount_paid: Money,
    pub status: InvoiceStatus,
    pub paid_date: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub status_before_paid: Option<InvoiceStatus>,
}

impl LedgerOutcome {
    /// Writes the outcome onto the invoice.
    pub fn apply_to(self, invoice: &mut Invoice) {
        invoice.amount_paid = self.amount_paid;
        invoice.status = self.status;
        invoice.paid_date = self.paid_date;
        invoice.payment_method = self.payment_method;
        invoice.status_before_paid = self.status_before_paid;
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Sum of all payment amounts.
pub fn total_paid(payments: &[PaymentRecord]) -> Money {
    payments.iter().map(|p| p.amount).sum()
}

/// What the client still owes. Never negative.
pub fn balance_due(invoice: &Invoice) -> Money {
    invoice.total.saturating_sub(invoice.amount_paid)
}

/// Amount paid beyond the invoice total.
pub fn credit_balance(invoice: &Invoice) -> Money {
    invoice.amount_paid.saturating_sub(invoice.total)
}

// =============================================================================
// Operations
// =============================================================================

/// Adds `payment` to the invoice's payment set.
///
/// - `amount_paid = Σ payments + payment.amount`
/// - enters `paid` once `amount_paid >= total`; `paid_date` is the payment date
/// - the first payment method recorded on the invoice is kept
///
/// Overpayment is accepted; the excess shows up as [`credit_balance`].
pub fn apply_payment(
    invoice: &Invoice,
    payments: &[PaymentRecord],
    payment: &NewPayment,
) -> CoreResult<LedgerOutcome> {
    validate_new_payment(payment)?;

    let amount_paid = total_paid(payments) + payment.amount;
    let payment_method = invoice
        .payment_method
        .clone()
        .or_else(|| Some(payment.payment_method.trim().to_string()));

    let outcome = if amount_paid >= invoice.total && invoice.status != InvoiceStatus::Paid {
        LedgerOutcome {
            amount_paid,
            status: InvoiceStatus::Paid,
            paid_date: Some(payment.payment_date),
            payment_method,
            status_before_paid: Some(invoice.status),
        }
    } else {
        LedgerOutcome {
            amount_paid,
            status: invoice.status,
            paid_date: invoice.paid_date,
            payment_method,
            status_before_paid: invoice.status_before_paid,
        }
    };

    Ok(outcome)
}

/// Removes the payment `payment_id` from the invoice's payment set.
///
/// Resulting status:
/// - `paid` when the remaining payments still cover the total
/// - leaving `paid` with something still paid: `sent`
/// - leaving `paid` with nothing paid: the status the invoice held before
///   it was paid (`sent` if that is unknown)
/// - an invoice that was not `paid` keeps its status
pub fn reverse_payment(
    invoice: &Invoice,
    payments: &[PaymentRecord],
    payment_id: &str,
) -> CoreResult<LedgerOutcome> {
    let removed = payments
        .iter()
        .find(|p| p.id == payment_id)
        .ok_or_else(|| CoreError::PaymentNotFound {
            payment_id: payment_id.to_string(),
        })?;

    let amount_paid = total_paid(payments).saturating_sub(removed.amount);

    let outcome = if amount_paid >= invoice.total {
        let was_paid = invoice.status == InvoiceStatus::Paid;
        LedgerOutcome {
            amount_paid,
            status: InvoiceStatus::Paid,
            paid_date: if was_paid {
                invoice.paid_date
            } else {
                Some(removed.payment_date)
            },
            payment_method: invoice.payment_method.clone(),
            status_before_paid: if was_paid {
                invoice.status_before_paid
            } else {
                Some(invoice.status)
            },
        }
    } else {
        let status = match invoice.status {
            InvoiceStatus::Paid if amount_paid.is_positive() => InvoiceStatus::Sent,
            InvoiceStatus::Paid => invoice.status_before_paid.unwrap_or(InvoiceStatus::Sent),
            current => current,
        };

        LedgerOutcome {
            amount_paid,
            status,
            paid_date: None,
            payment_method: invoice.payment_method.clone(),
            status_before_paid: None,
        }
    };

    Ok(outcome)
}

// =============================================================================
// Unit Tests
// =============================================================================
