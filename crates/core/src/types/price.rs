//! Type-safe price representation using decimal arithmetic.
//!
//! All festival merchandise is sold in Indian rupees, so a [`Price`] is a
//! non-negative decimal amount with no currency field.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// A non-negative amount in rupees.
///
/// Deserialization accepts both JSON numbers and strings (catalog documents
/// store `cost` as a number) and rejects negative values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, returning `None` for negative amounts.
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        (!amount.is_sign_negative() || amount.is_zero()).then_some(Self(amount))
    }

    /// Create a price from a whole number of rupees.
    #[must_use]
    pub fn from_rupees(rupees: u32) -> Self {
        Self(Decimal::from(rupees))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rs.{}", self.0.normalize())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n.to_string(),
            Raw::Text(s) => s,
        };
        let amount: Decimal = text.trim().parse().map_err(serde::de::Error::custom)?;
        Self::new(amount).ok_or_else(|| serde::de::Error::custom("price cannot be negative"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert!(Price::new(Decimal::new(-1, 0)).is_none());
        assert!(Price::new(Decimal::ZERO).is_some());
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_rupees(499).to_string(), "Rs.499");
        assert_eq!(Price::new(Decimal::new(4995, 1)).unwrap().to_string(), "Rs.499.5");
    }

    #[test]
    fn test_arithmetic() {
        let total: Price = [Price::from_rupees(50) * 2, Price::from_rupees(25)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_rupees(125));
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let from_number: Price = serde_json::from_str("349").unwrap();
        let from_string: Price = serde_json::from_str("\"349\"").unwrap();
        assert_eq!(from_number, Price::from_rupees(349));
        assert_eq!(from_string, from_number);
        assert!(serde_json::from_str::<Price>("-5").is_err());
    }
}
