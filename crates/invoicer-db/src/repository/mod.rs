//! # Repository Module
//!
//! Database repository implementations for Invoicer.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reads                          Writes                                  │
//! │  ─────                          ──────                                  │
//! │  db.invoices().list(filter)     db.service(cfg).record_payment(..)     │
//! │       │                              │                                  │
//! │       ▼                              ▼  one transaction                 │
//! │  InvoiceRepository              invoice::fetch / payment::list_for_..  │
//! │  PaymentRepository              core operation (pure)                  │
//! │  SequenceRepository             invoice::update_versioned              │
//! │       │                              │                                  │
//! │       └──────────────┬───────────────┘                                  │
//! │                      ▼                                                  │
//! │               SQLite Database                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each module exposes a pool-backed repository for reads, plus free
//! functions taking `&mut SqliteConnection` so the service can compose them
//! inside one transaction.
//!
//! ## Available Repositories
//!
//! - [`InvoiceRepository`] - Invoice reads and filtered listing
//! - [`PaymentRepository`] - Payment history
//! - [`SequenceRepository`] - Per-user invoice number counters
//! - [`AccountRepository`] - Users and clients

pub mod account;
pub mod invoice;
pub mod payment;
pub mod sequence;

pub use account::AccountRepository;
pub use invoice::{InvoiceFilter, InvoicePage, InvoiceRepository};
pub use payment::PaymentRepository;
pub use sequence::SequenceRepository;

use invoicer_core::{Money, Percent};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{DbError, DbResult};

// =============================================================================
// Decimal Columns
// =============================================================================

pub(crate) fn parse_decimal(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|_| DbError::corrupt(column, value))
}

pub(crate) fn parse_money(column: &str, value: &str) -> DbResult<Money> {
    parse_decimal(column, value).map(Money::from_decimal)
}

pub(crate) fn parse_percent(column: &str, value: &str) -> DbResult<Percent> {
    parse_decimal(column, value).map(Percent::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_columns() {
        assert_eq!(
            parse_money("total", "1925.00").unwrap(),
            Money::from_major(1925)
        );
        assert_eq!(
            parse_percent("tax_rate", "8.25").unwrap(),
            Percent::new(Decimal::new(825, 2))
        );

        let err = parse_money("total", "12,00").unwrap_err();
        assert!(matches!(err, DbError::Corrupt { column, .. } if column == "total"));
    }
}
