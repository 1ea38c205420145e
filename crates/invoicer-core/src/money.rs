//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With f64:                                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │    Ten payments of 165.00 may not sum to exactly 1650.00               │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal::Decimal                                    │
//! │    Exact base-10 arithmetic, 28 significant digits                     │
//! │    1750.00 × 8.25 / 100 = 144.375 (exact, no rounding)                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoice totals are stored unrounded. Rounding to two places happens
//! only at presentation time through [`Money::round_for_display`].
//!
//! ## Usage
//! ```rust
//! use invoicer_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let price = Money::from_major(100);
//! let line = price.multiply_quantity(Decimal::from(10));
//! assert_eq!(line, Money::from_major(1000));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use crate::types::Percent;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in major currency units (e.g. dollars), held exactly.
///
/// The currency itself lives on the invoice; all amounts belonging to one
/// invoice share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn from_decimal(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates an amount from whole major units.
    ///
    /// ```rust
    /// use invoicer_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(1650).to_string(), "1650.00");
    /// ```
    #[inline]
    pub fn from_major(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Creates an amount from minor units (cents).
    ///
    /// ```rust
    /// use invoicer_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(1099).to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_minor(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Returns the underlying decimal.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns `self - other`, floored at zero.
    pub fn saturating_sub(self, other: Money) -> Money {
        if other >= self {
            Money::zero()
        } else {
            self - other
        }
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// ## Example
    /// ```rust
    /// use invoicer_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let hourly = Money::from_major(150);
    /// let line = hourly.multiply_quantity(Decimal::new(25, 1)); // 2.5 hours
    /// assert_eq!(line, Money::from_major(375));
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, quantity: Decimal) -> Money {
        Money(self.0 * quantity)
    }

    /// Returns `rate` percent of this amount, unrounded.
    ///
    /// ## Example
    /// ```rust
    /// use invoicer_core::money::Money;
    /// use invoicer_core::types::Percent;
    ///
    /// let subtotal = Money::from_major(1750);
    /// let tax = subtotal.percentage(Percent::from_whole(10));
    /// assert_eq!(tax, Money::from_major(175));
    /// ```
    pub fn percentage(&self, rate: Percent) -> Money {
        Money(self.0 * rate.value() / Decimal::ONE_HUNDRED)
    }

    /// Rounds to two decimal places using banker's rounding.
    ///
    /// Presentation only: stored totals are never rounded.
    pub fn round_for_display(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven),
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount rounded to two places, without a currency symbol.
///
/// Currency formatting belongs to the dashboard, which knows the locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.round_for_display().0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
