//! Monetary amounts backed by decimal arithmetic.
//!
//! All prices, totals, and charges in Marigold use [`Money`]. Floating
//! point never touches a charged amount.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount in the store currency's standard unit (e.g., dollars).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from whole currency units.
    #[must_use]
    pub fn from_major(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Create an amount from the smallest currency unit (e.g., cents).
    #[must_use]
    pub fn from_minor(minor: i64) -> Self {
        Self(Decimal::new(minor, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line-total arithmetic: this amount multiplied by a quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_times_and_sum() {
        let unit = Money::from_minor(2500); // $25.00
        let lines = [unit.times(2), Money::from_major(5)];
        let total: Money = lines.into_iter().sum();
        assert_eq!(total, Money::from_major(55));
    }

    #[test]
    fn test_display_two_places() {
        assert_eq!(Money::from_major(5).display(), "$5.00");
        assert_eq!(Money::from_minor(250).display(), "$2.50");
        assert_eq!(format!("{}", Money::from_minor(1999)), "19.99");
    }

    #[test]
    fn test_serde_accepts_numbers_and_strings() {
        let from_number: Money = serde_json::from_str("5").unwrap();
        let from_fraction: Money = serde_json::from_str("2.50").unwrap();
        let from_string: Money = serde_json::from_str("\"57.50\"").unwrap();

        assert_eq!(from_number, Money::from_major(5));
        assert_eq!(from_fraction, Money::from_minor(250));
        assert_eq!(from_string, Money::from_minor(5750));
    }

    #[test]
    fn test_zero_is_default() {
        assert_eq!(Money::default(), Money::ZERO);
        assert_eq!(Money::ZERO + Money::ZERO, Money::ZERO);
    }
}
