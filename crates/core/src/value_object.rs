//! Value objects: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// create a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Non-negative amount of money in the smallest currency unit (two decimal places).
///
/// All ledger arithmetic happens on this exact representation; decimal numbers
/// only appear at the persistence boundary (`from_decimal` / `to_decimal`).
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    const MINOR_PER_MAJOR: u64 = 100;

    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Whole currency units (e.g. `Money::from_major(10)` is `10.00`).
    pub const fn from_major(major: u64) -> Self {
        Self(major * Self::MINOR_PER_MAJOR)
    }

    pub const fn minor(self) -> u64 {
        self.0
    }

    /// Convert a decimal amount (as stored by the persistence layer) to money.
    ///
    /// Rounds half away from zero to the nearest cent.
    pub fn from_decimal(value: f64) -> DomainResult<Self> {
        if !value.is_finite() {
            return Err(DomainError::validation("amount must be a finite number"));
        }
        if value < 0.0 {
            return Err(DomainError::validation("amount must not be negative"));
        }
        let minor = (value * Self::MINOR_PER_MAJOR as f64).round();
        if minor >= u64::MAX as f64 {
            return Err(DomainError::validation("amount is too large"));
        }
        Ok(Self(minor as u64))
    }

    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / Self::MINOR_PER_MAJOR as f64
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    pub fn checked_mul(self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(u64::from(quantity)).map(Money)
    }

    pub fn saturating_mul(self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(u64::from(quantity)))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / Self::MINOR_PER_MAJOR,
            self.0 % Self::MINOR_PER_MAJOR
        )
    }
}

/// Clamps at `u64::MAX` minor units; use [`Money::checked_add`] where an
/// overflow has to be reported.
impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Money::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decimal_conversion_rounds_to_cents() {
        assert_eq!(Money::from_decimal(45.5).unwrap(), Money::from_minor(4550));
        // 0.29 * 100 is 28.999999999999996 in binary floating point.
        assert_eq!(Money::from_decimal(0.29).unwrap(), Money::from_minor(29));
        assert_eq!(Money::from_decimal(0.005).unwrap(), Money::from_minor(1));
    }

    #[test]
    fn negative_and_non_finite_amounts_are_rejected() {
        assert!(matches!(
            Money::from_decimal(-1.0),
            Err(DomainError::Validation(_))
        ));
        assert!(Money::from_decimal(f64::NAN).is_err());
        assert!(Money::from_decimal(f64::INFINITY).is_err());
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Money::from_minor(7505).to_string(), "75.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn money_serializes_as_minor_units() {
        let json = serde_json::to_string(&Money::from_major(12)).unwrap();
        assert_eq!(json, "1200");
    }

    proptest! {
        /// Property: converting cents to a decimal and back is lossless.
        #[test]
        fn decimal_round_trip_is_lossless(minor in 0u64..10_000_000_000u64) {
            let money = Money::from_minor(minor);
            prop_assert_eq!(Money::from_decimal(money.to_decimal()).unwrap(), money);
        }
    }
}
