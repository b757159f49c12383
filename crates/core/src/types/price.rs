//! Decimal amounts for prices and percentages.
//!
//! The vendor backend is inconsistent about number encoding: the same field
//! arrives as a JSON number in one response and a string in another. Both
//! types here parse from either textual form and serialize as strings so no
//! precision is lost on the way back.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`] or [`Percentage`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("'{0}' is not a valid number")]
    NotANumber(String),
    /// Prices must be strictly positive.
    #[error("price must be greater than zero")]
    NotPositive,
    /// Percentages must lie in `0..=100`.
    #[error("percentage must be between 0 and 100")]
    OutOfRange,
}

fn parse_decimal(s: &str) -> Result<Decimal, PriceError> {
    let trimmed = s.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| PriceError::NotANumber(trimmed.to_owned()))
}

/// A monetary amount in the store's currency.
///
/// The backend does not report a currency per amount, so none is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Wrap a decimal amount without validation.
    ///
    /// Amounts reported by the server are trusted as-is (including zero).
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Parse a price entered by a vendor.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a number or is not greater than zero.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = parse_decimal(s)?;
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        Ok(Self(amount))
    }

    /// Parse an amount reported by the server (zero and negatives allowed).
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a number.
    pub fn from_wire(s: &str) -> Result<Self, PriceError> {
        parse_decimal(s).map(Self)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A percentage in `0..=100`, used for VAT and discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(Decimal);

impl Percentage {
    /// Parse a percentage.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a number or falls outside `0..=100`.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let value = parse_decimal(s)?;
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(PriceError::OutOfRange);
        }
        Ok(Self(value))
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(Price::parse("19.99").unwrap().to_string(), "19.99");
        assert_eq!(Price::parse(" 5 ").unwrap().to_string(), "5.00");
    }

    #[test]
    fn test_parse_price_rejects_non_positive() {
        assert_eq!(Price::parse("0"), Err(PriceError::NotPositive));
        assert_eq!(Price::parse("-3"), Err(PriceError::NotPositive));
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        assert!(matches!(
            Price::parse("abc"),
            Err(PriceError::NotANumber(_))
        ));
    }

    #[test]
    fn test_from_wire_allows_zero() {
        assert_eq!(Price::from_wire("0").unwrap().amount(), Decimal::ZERO);
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(Percentage::parse("0").is_ok());
        assert!(Percentage::parse("100").is_ok());
        assert_eq!(Percentage::parse("100.5"), Err(PriceError::OutOfRange));
        assert_eq!(Percentage::parse("-1"), Err(PriceError::OutOfRange));
        assert_eq!(Percentage::parse("7.50").unwrap().to_string(), "7.5%");
    }
}
