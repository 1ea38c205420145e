//! # Invoice Lifecycle
//!
//! The invoice state machine. Every status change of an invoice goes through
//! one of the methods below.
//!
//! ## Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Operation            Allowed from                  Result             │
//! │  ───────────────────  ────────────────────────────  ────────────────── │
//! │  send                 draft                         sent               │
//! │  mark_viewed          sent, viewed                  viewed             │
//! │  record_payment       sent, viewed                  paid when covered  │
//! │  reverse_payment      any but canceled              see ledger         │
//! │  mark_paid_manually   draft, sent, viewed           paid               │
//! │  cancel               draft, sent, viewed           canceled           │
//! │  edit                 draft (all), sent/viewed      unchanged          │
//! │                       (notes and terms only)                           │
//! │                                                                         │
//! │  overdue is never stored: sent/viewed past due_date READ as overdue.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All methods take `now` from the caller; nothing here reads the clock.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::calculator::compute_totals;
use crate::error::{CoreError, CoreResult};
use crate::ledger;
use crate::money::Money;
use crate::types::{
    Invoice, InvoiceAction, InvoiceEdit, InvoiceStatus, InvoiceView, LineItem, NewInvoice,
    NewPayment, PaymentRecord,
};
use crate::validation::{
    validate_currency, validate_items, validate_new_invoice, validate_optional_text,
    validate_rate, validate_required_text,
};
use crate::MAX_NOTES_LEN;

const SECONDS_PER_DAY: i64 = 86_400;

/// Assigns display positions in list order.
fn renumber(items: &mut [LineItem]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.sort_order = index as i64;
    }
}

/// Blank text clears the field.
fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

impl Invoice {
    // =========================================================================
    // Creation
    // =========================================================================

    /// Creates a draft invoice with freshly computed totals.
    ///
    /// `invoice_number` comes from the caller's per-user sequence.
    pub fn create(input: NewInvoice, invoice_number: String, now: DateTime<Utc>) -> CoreResult<Self> {
        validate_new_invoice(&input)?;

        let mut items = input.items;
        renumber(&mut items);
        let totals = compute_totals(&items, input.tax_rate, input.discount_rate)?;

        Ok(Invoice {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            client_id: input.client_id,
            invoice_number,
            status: InvoiceStatus::Draft,
            issue_date: input.issue_date,
            due_date: input.due_date,
            paid_date: None,
            items,
            subtotal: totals.subtotal,
            tax_rate: input.tax_rate,
            tax_amount: totals.tax_amount,
            discount_rate: input.discount_rate,
            discount_amount: totals.discount_amount,
            total: totals.total,
            amount_paid: Money::zero(),
            payment_method: None,
            currency: input.currency,
            notes: input.notes.and_then(non_blank),
            terms: input.terms.and_then(non_blank),
            sent_at: None,
            view_count: 0,
            last_viewed_at: None,
            status_before_paid: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    fn invalid_transition(&self, action: InvoiceAction) -> CoreError {
        CoreError::InvalidTransition {
            invoice_id: self.id.clone(),
            from: self.status,
            action,
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Sends a draft: `draft → sent`.
    pub fn send(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != InvoiceStatus::Draft {
            return Err(self.invalid_transition(InvoiceAction::Send));
        }

        self.status = InvoiceStatus::Sent;
        self.sent_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Records that the client opened the invoice.
    ///
    /// `sent → viewed`; repeated views of a viewed invoice only bump the
    /// view counter.
    pub fn mark_viewed(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        match self.status {
            InvoiceStatus::Sent => self.status = InvoiceStatus::Viewed,
            InvoiceStatus::Viewed => {}
            _ => return Err(self.invalid_transition(InvoiceAction::MarkViewed)),
        }

        self.view_count += 1;
        self.last_viewed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Records a payment and returns the new record.
    ///
    /// `payments` must be the invoice's full current payment set.
    pub fn record_payment(
        &mut self,
        payments: &[PaymentRecord],
        payment: NewPayment,
        now: DateTime<Utc>,
    ) -> CoreResult<PaymentRecord> {
        // Drafts still have editable totals; payments start once sent.
        if !matches!(self.status, InvoiceStatus::Sent | InvoiceStatus::Viewed) {
            return Err(self.invalid_transition(InvoiceAction::RecordPayment));
        }

        let outcome = ledger::apply_payment(self, payments, &payment)?;

        let record = PaymentRecord {
            id: Uuid::new_v4().to_string(),
            invoice_id: self.id.clone(),
            user_id: self.user_id.clone(),
            amount: payment.amount,
            currency: self.currency.clone(),
            payment_method: payment.payment_method.trim().to_string(),
            payment_date: payment.payment_date,
            reference: payment.reference.and_then(non_blank),
            notes: payment.notes.and_then(non_blank),
            created_at: now,
        };

        outcome.apply_to(self);
        self.updated_at = now;
        Ok(record)
    }

    /// Removes a recorded payment and returns it.
    ///
    /// This is the correction path out of `paid`.
    pub fn reverse_payment(
        &mut self,
        payments: &[PaymentRecord],
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<PaymentRecord> {
        if self.status == InvoiceStatus::Canceled {
            return Err(self.invalid_transition(InvoiceAction::ReversePayment));
        }

        let outcome = ledger::reverse_payment(self, payments, payment_id)?;
        let removed = payments
            .iter()
            .find(|p| p.id == payment_id)
            .cloned()
            .ok_or_else(|| CoreError::PaymentNotFound {
                payment_id: payment_id.to_string(),
            })?;

        outcome.apply_to(self);
        self.updated_at = now;
        Ok(removed)
    }

    /// Marks the invoice paid without a payment record.
    pub fn mark_paid_manually(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(self.invalid_transition(InvoiceAction::MarkPaid));
        }

        self.status_before_paid = Some(self.status);
        self.status = InvoiceStatus::Paid;
        self.amount_paid = self.total;
        self.paid_date = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Voids the invoice.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.status.can_transition_to(InvoiceStatus::Canceled) {
            return Err(self.invalid_transition(InvoiceAction::Cancel));
        }

        self.status = InvoiceStatus::Canceled;
        self.updated_at = now;
        Ok(())
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Applies a partial update.
    ///
    /// ## Errors
    /// - `ImmutableInvoice` for any edit of a paid/canceled invoice
    /// - `ImmutableInvoice` for a document edit (items, rates, currency,
    ///   client, dates) once the invoice has left `draft`
    /// - `Validation` for malformed values; the invoice is left unchanged
    pub fn edit(&mut self, edit: InvoiceEdit, now: DateTime<Utc>) -> CoreResult<()> {
        let immutable = self.status.is_terminal()
            || (edit.touches_document() && self.status != InvoiceStatus::Draft);
        if immutable {
            return Err(CoreError::ImmutableInvoice {
                invoice_id: self.id.clone(),
                status: self.status,
            });
        }

        if let Some(client_id) = &edit.client_id {
            validate_required_text("client_id", client_id, 64)?;
        }
        if let Some(items) = &edit.items {
            validate_items(items)?;
        }
        if let Some(rate) = edit.tax_rate {
            validate_rate("tax_rate", rate)?;
        }
        if let Some(rate) = edit.discount_rate {
            validate_rate("discount_rate", rate)?;
        }
        if let Some(currency) = &edit.currency {
            validate_currency(currency)?;
        }
        validate_optional_text("notes", edit.notes.as_deref(), MAX_NOTES_LEN)?;
        validate_optional_text("terms", edit.terms.as_deref(), MAX_NOTES_LEN)?;

        let recompute = edit.touches_totals();
        let mut items = edit.items.unwrap_or_else(|| self.items.clone());
        renumber(&mut items);
        let tax_rate = edit.tax_rate.unwrap_or(self.tax_rate);
        let discount_rate = edit.discount_rate.unwrap_or(self.discount_rate);

        if recompute {
            let totals = compute_totals(&items, tax_rate, discount_rate)?;
            self.subtotal = totals.subtotal;
            self.tax_amount = totals.tax_amount;
            self.discount_amount = totals.discount_amount;
            self.total = totals.total;
        }

        self.items = items;
        self.tax_rate = tax_rate;
        self.discount_rate = discount_rate;

        if let Some(client_id) = edit.client_id {
            self.client_id = client_id;
        }
        if let Some(currency) = edit.currency {
            self.currency = currency;
        }
        if let Some(issue_date) = edit.issue_date {
            self.issue_date = issue_date;
        }
        if let Some(due_date) = edit.due_date {
            self.due_date = due_date;
        }
        if let Some(notes) = edit.notes {
            self.notes = non_blank(notes);
        }
        if let Some(terms) = edit.terms {
            self.terms = non_blank(terms);
        }

        self.updated_at = now;
        Ok(())
    }

    // =========================================================================
    // Read-time Derivations
    // =========================================================================

    /// Status as reported to callers: `overdue` replaces sent/viewed once the
    /// due date has passed.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvoiceStatus {
        match self.status {
            InvoiceStatus::Sent | InvoiceStatus::Viewed if self.due_date < now => {
                InvoiceStatus::Overdue
            }
            status => status,
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == InvoiceStatus::Overdue
    }

    /// Days until the due date, rounded up. Negative once past due.
    pub fn days_until_due(&self, now: DateTime<Utc>) -> i64 {
        let seconds = (self.due_date - now).num_seconds();
        let days = seconds.div_euclid(SECONDS_PER_DAY);
        if seconds.rem_euclid(SECONDS_PER_DAY) > 0 {
            days + 1
        } else {
            days
        }
    }

    /// Builds the read model.
    pub fn view(&self, now: DateTime<Utc>) -> InvoiceView {
        InvoiceView {
            status: self.effective_status(now),
            balance_due: ledger::balance_due(self),
            credit_balance: ledger::credit_balance(self),
            days_until_due: self.days_until_due(now),
            invoice: self.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, draft_invoice, new_invoice, payment_input, sent_invoice};
    use crate::types::Percent;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_computes_totals() {
        let invoice = draft_invoice();

        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.subtotal, Money::from_major(1750));
        assert_eq!(invoice.tax_amount, Money::from_major(175));
        assert_eq!(invoice.total, Money::from_major(1925));
        assert_eq!(invoice.amount_paid, Money::zero());
        assert_eq!(invoice.items[1].sort_order, 1);
        assert_eq!(invoice.version, 0);
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let mut input = new_invoice();
        input.items.clear();
        assert!(matches!(
            Invoice::create(input, "INV-0001".to_string(), at(2024, 3, 1)),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_send_draft() {
        let mut invoice = draft_invoice();
        invoice.send(at(2024, 3, 2)).unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Sent);
        assert_eq!(invoice.sent_at, Some(at(2024, 3, 2)));
    }

    #[test]
    fn test_send_twice_fails() {
        let mut invoice = draft_invoice();
        invoice.send(at(2024, 3, 2)).unwrap();

        let err = invoice.send(at(2024, 3, 3)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                from: InvoiceStatus::Sent,
                action: InvoiceAction::Send,
                ..
            }
        ));
        assert_eq!(invoice.sent_at, Some(at(2024, 3, 2)));
    }

    #[test]
    fn test_mark_viewed_tracks_views() {
        let mut invoice = draft_invoice();
        assert!(invoice.mark_viewed(at(2024, 3, 2)).is_err());

        invoice.send(at(2024, 3, 2)).unwrap();
        invoice.mark_viewed(at(2024, 3, 3)).unwrap();
        invoice.mark_viewed(at(2024, 3, 4)).unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Viewed);
        assert_eq!(invoice.view_count, 2);
        assert_eq!(invoice.last_viewed_at, Some(at(2024, 3, 4)));
    }

    #[test]
    fn test_payment_then_reversal_scenario() {
        let mut invoice = sent_invoice(Money::from_major(1650));
        let payment = payment_input(Money::from_major(1650), "bank_transfer", at(2024, 3, 10));

        let record = invoice.record_payment(&[], payment, at(2024, 3, 10)).unwrap();
        assert_eq!(invoice.amount_paid, Money::from_major(1650));
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.paid_date, Some(at(2024, 3, 10)));
        assert_eq!(record.currency, "USD");

        let removed = invoice
            .reverse_payment(&[record.clone()], &record.id, at(2024, 3, 11))
            .unwrap();
        assert_eq!(removed, record);
        assert_eq!(invoice.amount_paid, Money::zero());
        assert_eq!(invoice.status, InvoiceStatus::Sent);
        assert_eq!(invoice.paid_date, None);
    }

    #[test]
    fn test_payment_on_terminal_invoice_rejected() {
        let mut invoice = sent_invoice(Money::from_major(100));
        invoice.mark_paid_manually(at(2024, 3, 5)).unwrap();

        let payment = payment_input(Money::from_major(10), "cash", at(2024, 3, 6));
        assert!(matches!(
            invoice.record_payment(&[], payment.clone(), at(2024, 3, 6)),
            Err(CoreError::InvalidTransition { .. })
        ));

        let mut canceled = sent_invoice(Money::from_major(100));
        canceled.cancel(at(2024, 3, 5)).unwrap();
        assert!(canceled.record_payment(&[], payment, at(2024, 3, 6)).is_err());
    }

    #[test]
    fn test_payment_on_draft_rejected() {
        let mut invoice = draft_invoice();
        let payment = payment_input(Money::from_major(1000), "cash", at(2024, 3, 2));

        let err = invoice.record_payment(&[], payment, at(2024, 3, 2)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                from: InvoiceStatus::Draft,
                action: InvoiceAction::RecordPayment,
                ..
            }
        ));
        assert_eq!(invoice.amount_paid, Money::zero());

        // Totals stay consistent with the (empty) payment set after an edit.
        invoice
            .edit(
                InvoiceEdit {
                    items: Some(vec![LineItem::from_quantity(
                        "Audit",
                        dec!(1),
                        Money::from_major(100),
                    )]),
                    ..Default::default()
                },
                at(2024, 3, 3),
            )
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.total, Money::from_major(110));
        assert_eq!(invoice.amount_paid, Money::zero());
        assert_eq!(ledger::balance_due(&invoice), Money::from_major(110));

        invoice.mark_paid_manually(at(2024, 3, 4)).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_mark_paid_manually() {
        let mut invoice = sent_invoice(Money::from_major(500));
        invoice.mark_paid_manually(at(2024, 3, 5)).unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.amount_paid, Money::from_major(500));
        assert_eq!(invoice.paid_date, Some(at(2024, 3, 5)));
        assert_eq!(invoice.status_before_paid, Some(InvoiceStatus::Sent));
    }

    #[test]
    fn test_cancel_rules() {
        let mut draft = draft_invoice();
        draft.cancel(at(2024, 3, 2)).unwrap();
        assert_eq!(draft.status, InvoiceStatus::Canceled);
        assert!(draft.cancel(at(2024, 3, 3)).is_err());

        // Overdue is derived; the stored status is still sent.
        let mut overdue = sent_invoice(Money::from_major(100));
        assert!(overdue.is_overdue(at(2024, 5, 1)));
        overdue.cancel(at(2024, 5, 1)).unwrap();
        assert_eq!(overdue.status, InvoiceStatus::Canceled);

        let mut paid = sent_invoice(Money::from_major(100));
        paid.mark_paid_manually(at(2024, 3, 5)).unwrap();
        let err = paid.cancel(at(2024, 3, 6)).unwrap_err();
        assert_eq!(err.to_string(), format!("Invoice {} is paid, cannot cancel", paid.id));
    }

    #[test]
    fn test_draft_edit_recomputes_totals() {
        let mut invoice = draft_invoice();
        let edit = InvoiceEdit {
            tax_rate: Some(Percent::zero()),
            discount_rate: Some(Percent::from_whole(10)),
            ..Default::default()
        };

        invoice.edit(edit, at(2024, 3, 2)).unwrap();

        assert_eq!(invoice.tax_amount, Money::zero());
        assert_eq!(invoice.discount_amount, Money::from_major(175));
        assert_eq!(invoice.total, Money::from_major(1575));
    }

    #[test]
    fn test_edit_replaces_items() {
        let mut invoice = draft_invoice();
        let edit = InvoiceEdit {
            items: Some(vec![LineItem::from_quantity(
                "Hosting",
                dec!(12),
                Money::from_major(20),
            )]),
            ..Default::default()
        };

        invoice.edit(edit, at(2024, 3, 2)).unwrap();

        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.subtotal, Money::from_major(240));
        assert_eq!(invoice.total, Money::from_major(264));
    }

    #[test]
    fn test_sent_invoice_money_is_frozen() {
        let mut invoice = sent_invoice(Money::from_major(100));
        let before = invoice.clone();

        let err = invoice
            .edit(
                InvoiceEdit {
                    tax_rate: Some(Percent::from_whole(20)),
                    ..Default::default()
                },
                at(2024, 3, 5),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::ImmutableInvoice { .. }));
        assert_eq!(invoice, before);

        invoice
            .edit(
                InvoiceEdit {
                    notes: Some("Thanks for your business".to_string()),
                    ..Default::default()
                },
                at(2024, 3, 5),
            )
            .unwrap();
        assert_eq!(invoice.notes.as_deref(), Some("Thanks for your business"));
    }

    #[test]
    fn test_paid_invoice_is_fully_frozen() {
        let mut invoice = sent_invoice(Money::from_major(100));
        invoice.mark_paid_manually(at(2024, 3, 5)).unwrap();

        let err = invoice
            .edit(
                InvoiceEdit {
                    terms: Some("Net 30".to_string()),
                    ..Default::default()
                },
                at(2024, 3, 6),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::ImmutableInvoice {
                status: InvoiceStatus::Paid,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_edit_leaves_invoice_unchanged() {
        let mut invoice = draft_invoice();
        let before = invoice.clone();

        let result = invoice.edit(
            InvoiceEdit {
                notes: Some("updated".to_string()),
                discount_rate: Some(Percent::from_whole(150)),
                ..Default::default()
            },
            at(2024, 3, 2),
        );

        assert!(result.is_err());
        assert_eq!(invoice, before);
    }

    #[test]
    fn test_effective_status_and_view() {
        let mut invoice = sent_invoice(Money::from_major(100));
        let due = invoice.due_date;

        assert_eq!(invoice.effective_status(due), InvoiceStatus::Sent);
        assert_eq!(
            invoice.effective_status(due + Duration::seconds(1)),
            InvoiceStatus::Overdue
        );

        let payment = payment_input(Money::from_major(40), "cash", at(2024, 3, 10));
        invoice.record_payment(&[], payment, at(2024, 3, 10)).unwrap();

        let view = invoice.view(due + Duration::days(3));
        assert_eq!(view.status, InvoiceStatus::Overdue);
        assert_eq!(view.balance_due, Money::from_major(60));
        assert_eq!(view.credit_balance, Money::zero());
        assert_eq!(view.days_until_due, -3);
        assert_eq!(view.invoice.status, InvoiceStatus::Sent);
    }

    #[test]
    fn test_days_until_due_rounds_up() {
        let invoice = sent_invoice(Money::from_major(100));
        let due = invoice.due_date;

        assert_eq!(invoice.days_until_due(due), 0);
        assert_eq!(invoice.days_until_due(due - Duration::hours(1)), 1);
        assert_eq!(invoice.days_until_due(due - Duration::hours(36)), 2);
        assert_eq!(invoice.days_until_due(due + Duration::hours(36)), -1);
    }

    #[test]
    fn test_draft_and_paid_never_overdue() {
        let draft = draft_invoice();
        assert_eq!(draft.effective_status(at(2030, 1, 1)), InvoiceStatus::Draft);

        let mut paid = sent_invoice(Money::from_major(10));
        paid.mark_paid_manually(at(2024, 3, 5)).unwrap();
        assert_eq!(paid.effective_status(at(2030, 1, 1)), InvoiceStatus::Paid);
    }
}
