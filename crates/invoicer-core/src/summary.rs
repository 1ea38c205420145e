//! # Dashboard Summary
//!
//! Aggregates a user's invoices into the figures shown on the dashboard.
//!
//! ```text
//!   total_revenue       Σ total            of paid invoices
//!   revenue_this_month  Σ total            of invoices paid since the 1st
//!   outstanding         Σ balance_due      of sent / viewed / overdue
//!   overdue_amount      Σ balance_due      of overdue
//!   payment_methods     count, Σ total     of paid invoices, by method
//! ```
//!
//! [`revenue_by_day`] gives the revenue series behind the dashboard chart.
//!
//! Statuses are evaluated with [`Invoice::effective_status`], so overdue
//! invoices are counted as overdue even though they are stored as sent.
//! Canceled invoices only appear in the counts.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::ledger::balance_due;
use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus};

/// Number of invoices per effective status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatusCounts {
    pub draft: u32,
    pub sent: u32,
    pub viewed: u32,
    pub paid: u32,
    pub overdue: u32,
    pub canceled: u32,
}

impl StatusCounts {
    fn bump(&mut self, status: InvoiceStatus) {
        let slot = match status {
            InvoiceStatus::Draft => &mut self.draft,
            InvoiceStatus::Sent => &mut self.sent,
            InvoiceStatus::Viewed => &mut self.viewed,
            InvoiceStatus::Paid => &mut self.paid,
            InvoiceStatus::Overdue => &mut self.overdue,
            InvoiceStatus::Canceled => &mut self.canceled,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        self.draft + self.sent + self.viewed + self.paid + self.overdue + self.canceled
    }
}

/// Paid invoices settled with one payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentMethodTotal {
    pub payment_method: String,
    pub count: u32,
    #[ts(as = "String")]
    pub amount: Money,
}

/// Revenue from invoices paid on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyRevenue {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub count: u32,
    #[ts(as = "String")]
    pub amount: Money,
}

/// Revenue and receivables at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    #[ts(as = "String")]
    pub total_revenue: Money,
    #[ts(as = "String")]
    pub revenue_this_month: Money,
    #[ts(as = "String")]
    pub outstanding: Money,
    #[ts(as = "String")]
    pub overdue_amount: Money,
    pub counts: StatusCounts,
    /// Ordered by payment method.
    pub payment_methods: Vec<PaymentMethodTotal>,
}

impl DashboardSummary {
    /// Computes the summary as of `now`.
    ///
    /// Amounts in different currencies are added as-is; callers that mix
    /// currencies should group invoices first.
    pub fn compute(invoices: &[Invoice], now: DateTime<Utc>) -> Self {
        let month_start = start_of_month(now);
        let mut summary = DashboardSummary::default();
        let mut methods: BTreeMap<&str, (u32, Money)> = BTreeMap::new();

        for invoice in invoices {
            let status = invoice.effective_status(now);
            summary.counts.bump(status);

            if status == InvoiceStatus::Paid {
                summary.total_revenue += invoice.total;
                if invoice.paid_date.is_some_and(|paid| paid >= month_start) {
                    summary.revenue_this_month += invoice.total;
                }
                if let Some(method) = invoice.payment_method.as_deref() {
                    let entry = methods.entry(method).or_default();
                    entry.0 += 1;
                    entry.1 += invoice.total;
                }
            } else if status.is_outstanding() {
                let due = balance_due(invoice);
                summary.outstanding += due;
                if status == InvoiceStatus::Overdue {
                    summary.overdue_amount += due;
                }
            }
        }

        summary.payment_methods = methods
            .into_iter()
            .map(|(method, (count, amount))| PaymentMethodTotal {
                payment_method: method.to_string(),
                count,
                amount,
            })
            .collect();

        summary
    }
}

/// Paid revenue grouped by `paid_date` day, oldest first, for invoices
/// paid at or after `since`.
pub fn revenue_by_day(invoices: &[Invoice], since: DateTime<Utc>) -> Vec<DailyRevenue> {
    let mut days: BTreeMap<NaiveDate, (u32, Money)> = BTreeMap::new();

    for invoice in invoices.iter().filter(|i| i.status == InvoiceStatus::Paid) {
        let Some(paid) = invoice.paid_date.filter(|paid| *paid >= since) else {
            continue;
        };
        let entry = days.entry(paid.date_naive()).or_default();
        entry.0 += 1;
        entry.1 += invoice.total;
    }

    days.into_iter()
        .map(|(date, (count, amount))| DailyRevenue { date, count, amount })
        .collect()
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    today
        .with_day(1)
        .unwrap_or(today)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, draft_invoice, payment_input, sent_invoice};

    #[test]
    fn test_empty_summary() {
        let summary = DashboardSummary::compute(&[], at(2024, 3, 15));
        assert_eq!(summary, DashboardSummary::default());
    }

    #[test]
    fn test_summary_figures() {
        let now = at(2024, 4, 15);

        // Paid last month.
        let mut march = sent_invoice(Money::from_major(300));
        march.mark_paid_manually(at(2024, 3, 20)).unwrap();

        // Paid this month.
        let mut april = sent_invoice(Money::from_major(200));
        april.mark_paid_manually(at(2024, 4, 2)).unwrap();

        // Due 2024-03-31, partially paid: overdue by now.
        let mut late = sent_invoice(Money::from_major(500));
        let payment = payment_input(Money::from_major(100), "cash", at(2024, 3, 10));
        late.record_payment(&[], payment, at(2024, 3, 10)).unwrap();

        // Not yet due.
        let mut current = sent_invoice(Money::from_major(80));
        current.due_date = at(2024, 5, 1);

        let mut canceled = sent_invoice(Money::from_major(1000));
        canceled.cancel(at(2024, 3, 5)).unwrap();

        let invoices = vec![march, april, late, current, canceled, draft_invoice()];
        let summary = DashboardSummary::compute(&invoices, now);

        assert_eq!(summary.total_revenue, Money::from_major(500));
        assert_eq!(summary.revenue_this_month, Money::from_major(200));
        assert_eq!(summary.outstanding, Money::from_major(480));
        assert_eq!(summary.overdue_amount, Money::from_major(400));
        assert_eq!(summary.counts.paid, 2);
        assert_eq!(summary.counts.overdue, 1);
        assert_eq!(summary.counts.sent, 1);
        assert_eq!(summary.counts.canceled, 1);
        assert_eq!(summary.counts.draft, 1);
        assert_eq!(summary.counts.total(), 6);
    }

    #[test]
    fn test_payment_method_breakdown() {
        let now = at(2024, 4, 15);
        let pay = |total: i64, method: &str| {
            let mut invoice = sent_invoice(Money::from_major(total));
            let payment = payment_input(Money::from_major(total), method, at(2024, 4, 1));
            invoice.record_payment(&[], payment, at(2024, 4, 1)).unwrap();
            invoice
        };

        // Manually marked paid: no method, so not in the breakdown.
        let mut manual = sent_invoice(Money::from_major(70));
        manual.mark_paid_manually(at(2024, 4, 2)).unwrap();

        // Partially paid by card: outstanding, not in the breakdown.
        let mut partial = sent_invoice(Money::from_major(90));
        partial.due_date = at(2024, 5, 1);
        let payment = payment_input(Money::from_major(10), "card", at(2024, 4, 3));
        partial.record_payment(&[], payment, at(2024, 4, 3)).unwrap();

        let invoices = vec![pay(100, "cash"), pay(250, "card"), pay(50, "cash"), manual, partial];
        let summary = DashboardSummary::compute(&invoices, now);

        assert_eq!(
            summary.payment_methods,
            vec![
                PaymentMethodTotal {
                    payment_method: "card".to_string(),
                    count: 1,
                    amount: Money::from_major(250),
                },
                PaymentMethodTotal {
                    payment_method: "cash".to_string(),
                    count: 2,
                    amount: Money::from_major(150),
                },
            ]
        );
        assert_eq!(summary.total_revenue, Money::from_major(470));
        assert_eq!(summary.outstanding, Money::from_major(80));
    }

    #[test]
    fn test_revenue_by_day() {
        let paid_on = |total: i64, day: u32| {
            let mut invoice = sent_invoice(Money::from_major(total));
            invoice.mark_paid_manually(at(2024, 4, day)).unwrap();
            invoice
        };

        let mut canceled = sent_invoice(Money::from_major(999));
        canceled.cancel(at(2024, 4, 3)).unwrap();

        let invoices = vec![
            paid_on(40, 5),
            paid_on(10, 2),
            paid_on(25, 5),
            paid_on(500, 1),
            canceled,
            sent_invoice(Money::from_major(60)),
        ];
        let series = revenue_by_day(&invoices, at(2024, 4, 2));

        assert_eq!(
            series,
            vec![
                DailyRevenue {
                    date: at(2024, 4, 2).date_naive(),
                    count: 1,
                    amount: Money::from_major(10),
                },
                DailyRevenue {
                    date: at(2024, 4, 5).date_naive(),
                    count: 2,
                    amount: Money::from_major(65),
                },
            ]
        );
    }

    #[test]
    fn test_start_of_month() {
        assert_eq!(start_of_month(at(2024, 2, 29)), at(2024, 2, 1));
        assert_eq!(start_of_month(at(2024, 1, 1)), at(2024, 1, 1));
    }
}
