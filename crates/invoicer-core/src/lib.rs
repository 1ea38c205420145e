//! # invoicer-core: Pure Business Logic for Invoicer
//!
//! This crate is the **heart** of Invoicer. It holds the money math, the
//! payment ledger and the invoice state machine as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Invoicer Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Dashboard / API handlers (outside this workspace)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               invoicer-db (storage + InvoiceService)            │   │
//! │  │        transactions, versioned writes, invoice numbering        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ invoicer-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ calculator │  │  ledger   │  │ lifecycle │  │  summary  │  │   │
//! │  │   │  totals    │  │ payments  │  │  status   │  │ dashboard │  │   │
//! │  │   └────────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Invoice, LineItem, PaymentRecord, ...)
//! - [`money`] - Exact decimal Money type
//! - [`calculator`] - Subtotal, tax, discount and total
//! - [`ledger`] - Payment accumulation and reversal
//! - [`lifecycle`] - Invoice state machine
//! - [`summary`] - Dashboard aggregation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use invoicer_core::calculator::compute_totals;
//! use invoicer_core::money::Money;
//! use invoicer_core::types::{LineItem, Percent};
//! use rust_decimal::Decimal;
//!
//! let items = vec![LineItem::from_quantity("Consulting", Decimal::from(10), Money::from_major(165))];
//! let totals = compute_totals(&items, Percent::zero(), Percent::zero()).unwrap();
//!
//! assert_eq!(totals.total.to_string(), "1650.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calculator;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod money;
pub mod summary;
pub mod types;
pub mod validation;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use calculator::{compute_totals, InvoiceTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::LedgerOutcome;
pub use money::Money;
pub use summary::{revenue_by_day, DailyRevenue, DashboardSummary, PaymentMethodTotal, StatusCounts};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Currency used when a user has not chosen one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Prefix used for invoice numbers when a user has not set one.
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

/// Largest accepted price, line amount or payment, in major units.
pub const MAX_AMOUNT: i64 = 9_999_999_999;

/// Largest accepted line quantity.
pub const MAX_QUANTITY: i64 = 999_999;

pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_NOTES_LEN: usize = 5_000;
pub const MAX_PAYMENT_METHOD_LEN: usize = 50;
pub const MAX_REFERENCE_LEN: usize = 100;
