//! Type-safe price representation using decimal arithmetic.
//!
//! The store trades in a single currency, so a [`Price`] is just a strictly
//! positive amount with cent precision. On the wire prices are JSON numbers
//! (`45.5`), never strings.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Zero or negative amount.
    #[error("price must be greater than zero")]
    NotPositive,
    /// Input could not be read as a decimal number.
    #[error("price is not a number: {0}")]
    NotANumber(String),
    /// Above [`MAX_PRICE`].
    #[error("price must not exceed 1000000.00")]
    TooLarge,
}

/// Highest accepted unit price: 1,000,000.00.
pub const MAX_PRICE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 2);

/// Round a monetary amount to cents, midpoint away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A strictly positive unit price, rounded to cents, at most [`MAX_PRICE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::NotPositive` if the rounded amount is not above
    /// zero and `PriceError::TooLarge` if it exceeds [`MAX_PRICE`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        let rounded = round_money(amount);
        if rounded <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        if rounded > MAX_PRICE {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(rounded))
    }

    /// Parse a price from user input such as a multipart form field.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::NotANumber` for non-numeric input and
    /// `PriceError::NotPositive` for zero or negative amounts.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let amount = input
            .trim()
            .parse::<Decimal>()
            .map_err(|_| PriceError::NotANumber(input.to_owned()))?;
        Self::new(amount)
    }

    /// The amount in currency units.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive() {
        assert_eq!(Price::new(Decimal::ZERO), Err(PriceError::NotPositive));
        assert_eq!(Price::new(Decimal::new(-5, 0)), Err(PriceError::NotPositive));
        // rounds to 0.00
        assert_eq!(Price::new(Decimal::new(4, 3)), Err(PriceError::NotPositive));
    }

    #[test]
    fn test_ceiling() {
        assert_eq!(MAX_PRICE, Decimal::new(1_000_000, 0));
        assert_eq!(Price::parse("1000000").unwrap().amount(), MAX_PRICE);
        assert_eq!(Price::parse("1000000.01"), Err(PriceError::TooLarge));
        assert_eq!(Price::parse("10000000000"), Err(PriceError::TooLarge));
        assert!(serde_json::from_str::<Price>("1e12").is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(Price::parse(" 19.99 ").unwrap().amount(), Decimal::new(1999, 2));
        assert!(matches!(Price::parse("abc"), Err(PriceError::NotANumber(_))));
        assert_eq!(Price::parse("0"), Err(PriceError::NotPositive));
    }

    #[test]
    fn test_rounds_to_cents() {
        let price = Price::new(Decimal::new(10_005, 3)).unwrap();
        assert_eq!(price.amount(), Decimal::new(1001, 2));
        assert_eq!(price.to_string(), "10.01");
    }

    #[test]
    fn test_times() {
        let price = Price::parse("12.25").unwrap();
        assert_eq!(price.times(3), Decimal::new(3675, 2));
    }

    #[test]
    fn test_json_is_a_number() {
        let price = Price::parse("45.5").unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "45.5");
        let back: Price = serde_json::from_str("45.5").unwrap();
        assert_eq!(back, price);
        assert!(serde_json::from_str::<Price>("-1").is_err());
    }
}
