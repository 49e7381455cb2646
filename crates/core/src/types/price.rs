//! Type-safe price representation using decimal arithmetic.
//!
//! Money never touches floating point inside the client: amounts are
//! `rust_decimal::Decimal`, so summing `19.99` any number of times stays
//! exact. The remote schema stores prices as JSON numbers, so `Price`
//! serializes to a number and deserializes from either a number or a string.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A price in the store's currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Price(Decimal);

impl Price {
    /// Zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an amount in minor units (e.g., cents).
    #[must_use]
    pub fn from_minor_units(minor: i64) -> Self {
        Self(Decimal::new(minor, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Total for `quantity` units at this price.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use rust_decimal::prelude::ToPrimitive;

        // The remote price attribute is a float column; emit a number.
        match self.0.to_f64() {
            Some(f) => serializer.serialize_f64(f),
            None => Err(serde::ser::Error::custom("price out of f64 range")),
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Decimal::try_from(n)
                .map(Self)
                .map_err(serde::de::Error::custom),
            Raw::Text(s) => s
                .parse::<Decimal>()
                .map(Self)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_minor_units() {
        assert_eq!(Price::from_minor_units(1999).amount(), dec!(19.99));
        assert_eq!(Price::from_minor_units(0), Price::ZERO);
    }

    #[test]
    fn test_times_is_exact() {
        // 3 * 19.99 must be exactly 59.97, not 59.970000000000006
        let price = Price::new(dec!(19.99));
        assert_eq!(price.times(3), dec!(59.97));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::new(dec!(5)).to_string(), "$5.00");
        assert_eq!(Price::new(dec!(19.99)).to_string(), "$19.99");
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let from_number: Price = serde_json::from_str("19.99").expect("number");
        assert_eq!(from_number.amount(), dec!(19.99));

        let from_string: Price = serde_json::from_str("\"12.50\"").expect("string");
        assert_eq!(from_string.amount(), dec!(12.50));
    }
}
