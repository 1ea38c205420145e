//! # Validation Module
//!
//! Input validation for invoices, line items and payments.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dashboard form (TypeScript)                                  │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: invoicer-core (Rust)                                         │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE(user_id, invoice_number)                                   │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line item errors name the row: `items[2].amount`.
//!
//! ## Usage
//! ```rust
//! use invoicer_core::validation::{validate_currency, validate_payment_method};
//!
//! validate_currency("USD").unwrap();
//! assert!(validate_payment_method("   ").is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{LineItem, NewInvoice, NewPayment, Percent};
use crate::{
    MAX_AMOUNT, MAX_DESCRIPTION_LEN, MAX_NOTES_LEN, MAX_PAYMENT_METHOD_LEN, MAX_QUANTITY,
    MAX_REFERENCE_LEN,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn max_amount() -> Decimal {
    Decimal::from(MAX_AMOUNT)
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required, length-limited text field.
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    validate_optional_text(field, Some(value), max)
}

/// Validates an optional free-text field such as notes or terms.
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a payment method label (`bank_transfer`, `cash`, ...).
pub fn validate_payment_method(method: &str) -> ValidationResult<()> {
    validate_required_text("payment_method", method, MAX_PAYMENT_METHOD_LEN)
}

/// Validates an ISO-4217 currency code: three uppercase ASCII letters.
///
/// ## Example
/// ```rust
/// use invoicer_core::validation::validate_currency;
///
/// assert!(validate_currency("EUR").is_ok());
/// assert!(validate_currency("eur").is_err());
/// assert!(validate_currency("EURO").is_err());
/// ```
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    if code.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "currency".to_string(),
        });
    }

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a 3-letter ISO-4217 code".to_string(),
        });
    }

    Ok(())
}

/// Validates an invoice number prefix (`INV`, `ACME-2024`).
pub fn validate_invoice_prefix(prefix: &str) -> ValidationResult<()> {
    validate_required_text("invoice_prefix", prefix, 20)?;

    if !prefix
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "invoice_prefix".to_string(),
            reason: "only letters, digits, hyphens and underscores allowed".to_string(),
        });
    }

    Ok(())
}

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use invoicer_core::validation::validate_uuid;
///
/// assert!(validate_uuid("client_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("client_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: positive and at most [`MAX_QUANTITY`].
pub fn validate_quantity(field: &str, quantity: Decimal) -> ValidationResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if quantity > Decimal::from(MAX_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: Decimal::ZERO,
            max: Decimal::from(MAX_QUANTITY),
        });
    }

    Ok(())
}

/// Validates a non-negative amount (unit price, line amount).
pub fn validate_non_negative_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if amount.amount() > max_amount() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: Decimal::ZERO,
            max: max_amount(),
        });
    }

    Ok(())
}

/// Validates a payment amount: strictly positive, at most [`MAX_AMOUNT`].
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    validate_non_negative_amount("amount", amount)
}

/// Validates a tax or discount rate against `[0, 100]`.
///
/// ## Example
/// ```rust
/// use invoicer_core::types::Percent;
/// use invoicer_core::validation::validate_rate;
///
/// assert!(validate_rate("tax_rate", Percent::from_whole(10)).is_ok());
/// assert!(validate_rate("tax_rate", Percent::from_whole(101)).is_err());
/// ```
pub fn validate_rate(field: &str, rate: Percent) -> ValidationResult<()> {
    if !rate.is_valid_rate() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: Decimal::ZERO,
            max: Decimal::ONE_HUNDRED,
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates one line item, naming fields as `items[index].field`.
pub fn validate_line_item(index: usize, item: &LineItem) -> ValidationResult<()> {
    let field = |name: &str| format!("items[{}].{}", index, name);

    validate_required_text(&field("description"), &item.description, MAX_DESCRIPTION_LEN)?;
    validate_quantity(&field("quantity"), item.quantity)?;
    validate_non_negative_amount(&field("unit_price"), item.unit_price)?;
    validate_non_negative_amount(&field("amount"), item.amount)?;

    if let Some(rate) = item.tax_rate {
        validate_rate(&field("tax_rate"), rate)?;
    }

    Ok(())
}

/// Validates a non-empty list of line items.
pub fn validate_items(items: &[LineItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    items
        .iter()
        .enumerate()
        .try_for_each(|(index, item)| validate_line_item(index, item))
}

/// Validates everything about a new invoice that does not need storage.
pub fn validate_new_invoice(input: &NewInvoice) -> ValidationResult<()> {
    validate_required_text("user_id", &input.user_id, 64)?;
    validate_required_text("client_id", &input.client_id, 64)?;
    validate_items(&input.items)?;
    validate_rate("tax_rate", input.tax_rate)?;
    validate_rate("discount_rate", input.discount_rate)?;
    validate_currency(&input.currency)?;
    validate_optional_text("notes", input.notes.as_deref(), MAX_NOTES_LEN)?;
    validate_optional_text("terms", input.terms.as_deref(), MAX_NOTES_LEN)?;
    Ok(())
}

/// Validates a payment before it reaches the ledger.
pub fn validate_new_payment(payment: &NewPayment) -> ValidationResult<()> {
    validate_payment_amount(payment.amount)?;
    validate_payment_method(&payment.payment_method)?;
    validate_optional_text("reference", payment.reference.as_deref(), MAX_REFERENCE_LEN)?;
    validate_optional_text("notes", payment.notes.as_deref(), MAX_NOTES_LEN)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
