//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    399 + 249 = 648 (exactly, every time)                               │
//! │                                                                         │
//! │  Callers convert floats to minor units BEFORE crossing the boundary.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Overflow Policy
//! The kernel never wraps. Every operation that could leave the `i64` range
//! is `checked_*` and returns `None`, which the transaction layer reports as
//! [`CoreError::Overflow`](crate::error::CoreError::Overflow).
//!
//! ## Usage
//! ```rust
//! use pos_core::money::Money;
//!
//! let coffee = Money::from_minor(399).checked_mul_quantity(1).unwrap();
//! let muffin = Money::from_minor(249);
//! let total = coffee.checked_add(muffin).unwrap();
//! assert_eq!(total.minor(), 648);
//!
//! assert!(Money::from_minor(i64::MAX).checked_add(Money::from_minor(1)).is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents for USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: change due may legitimately be negative (under-tender)
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized transparently**: a snapshot shows `648`, not `{"0":648}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Subtracts `other` from `self`, returning `None` on overflow.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Multiplies a unit price by a quantity, returning `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use pos_core::money::Money;
    ///
    /// let unit_price = Money::from_minor(299);
    /// assert_eq!(unit_price.checked_mul_quantity(3).unwrap().minor(), 897);
    /// assert!(Money::from_minor(i64::MAX).checked_mul_quantity(2).is_none());
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Sums a sequence of amounts, returning `None` if any partial sum overflows.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Formats the amount as `major.minor` with the given number of decimal places.
    ///
    /// Used for log output only; presentation belongs to the caller.
    ///
    /// ## Example
    /// ```rust
    /// use pos_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(1099).format_with_places(2), "10.99");
    /// assert_eq!(Money::from_minor(-550).format_with_places(2), "-5.50");
    /// assert_eq!(Money::from_minor(1500).format_with_places(0), "1500");
    /// ```
    pub fn format_with_places(&self, places: u8) -> String {
        if places == 0 {
            return self.0.to_string();
        }
        // i64 has 19 digits; anything wider only adds leading zeros.
        let places = places.min(19);
        let scale = 10i128.pow(u32::from(places));
        let value = i128::from(self.0);
        let sign = if value < 0 { "-" } else { "" };
        let abs = value.abs();
        format!(
            "{}{}.{:0width$}",
            sign,
            abs / scale,
            abs % scale,
            width = usize::from(places)
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows two decimal places. For debugging only; transaction logs
/// use the transaction's own decimal places via
/// [`Money::format_with_places`].
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with_places(2))
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
