//! # Money Calculator
//!
//! Derives invoice totals from line items and rates.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   subtotal        = Σ item.amount                                       │
//! │   tax_amount      = subtotal × tax_rate / 100                           │
//! │   discount_amount = subtotal × discount_rate / 100                      │
//! │   total           = subtotal + tax_amount − discount_amount             │
//! │                                                                         │
//! │   Tax and discount are both taken from the subtotal, never from each   │
//! │   other. Nothing is rounded here.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Used by both invoice creation and draft edits, so a stored invoice can
//! never disagree with its own items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{LineItem, Percent};
use crate::validation::{validate_non_negative_amount, validate_rate};

/// The four derived money fields of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    #[ts(as = "String")]
    pub subtotal: Money,
    #[ts(as = "String")]
    pub tax_amount: Money,
    #[ts(as = "String")]
    pub discount_amount: Money,
    #[ts(as = "String")]
    pub total: Money,
}

/// Computes invoice totals.
///
/// The supplied `item.amount` is authoritative; quantity and unit price are
/// not re-multiplied here.
///
/// ## Errors
/// - `items` is empty
/// - `items[i].amount` is negative
/// - `tax_rate` / `discount_rate` outside `[0, 100]`
///
/// ## Example
/// ```rust
/// use invoicer_core::calculator::compute_totals;
/// use invoicer_core::money::Money;
/// use invoicer_core::types::{LineItem, Percent};
/// use rust_decimal::Decimal;
///
/// let items = vec![
///     LineItem::from_quantity("Design", Decimal::ONE, Money::from_major(1000)),
///     LineItem::from_quantity("Build", Decimal::ONE, Money::from_major(750)),
/// ];
/// let totals = compute_totals(&items, Percent::from_whole(10), Percent::zero()).unwrap();
/// assert_eq!(totals.total, Money::from_major(1925));
/// ```
pub fn compute_totals(
    items: &[LineItem],
    tax_rate: Percent,
    discount_rate: Percent,
) -> CoreResult<InvoiceTotals> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        }
        .into());
    }

    validate_rate("tax_rate", tax_rate)?;
    validate_rate("discount_rate", discount_rate)?;

    for (index, item) in items.iter().enumerate() {
        validate_non_negative_amount(&format!("items[{}].amount", index), item.amount)?;
    }

    let subtotal: Money = items.iter().map(|item| item.amount).sum();
    let tax_amount = subtotal.percentage(tax_rate);
    let discount_amount = subtotal.percentage(discount_rate);
    let total = subtotal + tax_amount - discount_amount;

    debug_assert!(total.amount() >= Decimal::ZERO);

    Ok(InvoiceTotals {
        subtotal,
        tax_amount,
        discount_amount,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
