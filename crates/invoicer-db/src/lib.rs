//! # invoicer-db: Persistence Layer for Invoicer
//!
//! SQLite storage for invoices, line items, payment records and per-user
//! invoice sequences, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Invoicer Data Flow                               │
//! │                                                                         │
//! │  API handler (record_payment)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   invoicer-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ InvoiceService│    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (service.rs)  │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ InvoiceRepo   │    │              │  │   │
//! │  │   │ transactions  │───►│ PaymentRepo   │    │ 001_initial_ │  │   │
//! │  │   │ version check │    │ SequenceRepo  │    │  schema.sql  │  │   │
//! │  │   │ retry/backoff │    │ AccountRepo   │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ pure operations                                     │   │
//! │  │           ▼                                                     │   │
//! │  │     invoicer-core (calculator, ledger, lifecycle)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Ledger settings (retries, defaults)
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories and transaction-scoped queries
//! - [`service`] - Transactional invoice operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use invoicer_db::{Database, DbConfig, LedgerConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/invoicer.db")).await?;
//! let service = db.service(LedgerConfig::default());
//!
//! let view = service.create_invoice(input).await?;
//! service.send_invoice(&user_id, &view.invoice.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, LedgerConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use service::InvoiceService;

// Repository re-exports for convenience
pub use repository::{
    AccountRepository, InvoiceFilter, InvoicePage, InvoiceRepository, PaymentRepository,
    SequenceRepository,
};
