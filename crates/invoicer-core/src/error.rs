//! # Error Types
//!
//! Domain-specific error types for invoicer-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  invoicer-core errors (this file)                                      │
//! │  ├── CoreError        - Lifecycle and ledger rule violations           │
//! │  └── ValidationError  - Malformed input (items, rates, amounts)        │
//! │                                                                         │
//! │  invoicer-db errors (separate crate)                                   │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these errors is fatal: each one is scoped to a single invoice
//! operation and carries enough context for the caller to present or retry it.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{InvoiceAction, InvoiceStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the ledger and the invoice lifecycle.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested transition is not legal from the invoice's current state.
    ///
    /// ## When This Occurs
    /// - `send` on an invoice that is no longer a draft
    /// - `cancel` on a paid invoice
    /// - recording a payment against a canceled invoice
    #[error("Invoice {invoice_id} is {from}, cannot {action}")]
    InvalidTransition {
        invoice_id: String,
        from: InvoiceStatus,
        action: InvoiceAction,
    },

    /// An edit was attempted on an invoice whose fields are frozen.
    ///
    /// Monetary fields are frozen once the invoice leaves `draft`; every
    /// field is frozen once it is `paid` or `canceled`.
    #[error("Invoice {invoice_id} is {status} and cannot be edited")]
    ImmutableInvoice {
        invoice_id: String,
        status: InvoiceStatus,
    },

    /// A concurrent update to the same invoice won the race.
    ///
    /// The caller should re-fetch the invoice and reapply the operation.
    #[error("Invoice {invoice_id} was modified concurrently")]
    ConcurrencyConflict { invoice_id: String },

    /// The payment to reverse is not part of the invoice's payment history.
    #[error("Payment not found: {payment_id}")]
    PaymentNotFound { payment_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true when re-fetching and retrying may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::ConcurrencyConflict { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// The `field` always names the offending input, using `items[i].field`
/// for line items so the caller can point at the exact row.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: Decimal,
        max: Decimal,
    },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, unknown currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidTransition {
            invoice_id: "inv-1".to_string(),
            from: InvoiceStatus::Paid,
            action: InvoiceAction::Cancel,
        };
        assert_eq!(err.to_string(), "Invoice inv-1 is paid, cannot cancel");

        let err = CoreError::ImmutableInvoice {
            invoice_id: "inv-1".to_string(),
            status: InvoiceStatus::Sent,
        };
        assert_eq!(err.to_string(), "Invoice inv-1 is sent and cannot be edited");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");

        let err = ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: Decimal::ZERO,
            max: Decimal::ONE_HUNDRED,
        };
        assert_eq!(err.to_string(), "tax_rate must be between 0 and 100");
        assert_eq!(err.field(), "tax_rate");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustNotBeNegative {
            field: "items[0].amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert!(!core_err.is_retryable());
    }

    #[test]
    fn test_conflict_is_retryable() {
        let err = CoreError::ConcurrencyConflict {
            invoice_id: "inv-1".to_string(),
        };
        assert!(err.is_retryable());
    }
}
