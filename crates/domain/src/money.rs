//! Monetary amounts and currencies.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors converting external amounts into [`Money`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount {0} is out of range")]
    OutOfRange(Decimal),

    /// A line or order total no longer fits in the cents representation.
    #[error("amount exceeds the supported range")]
    Overflow,

    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),
}

/// An amount in minor units (cents).
///
/// All arithmetic is integral and checked. Decimal amounts from the outside world are
/// rounded to two places, half away from zero, at the boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Converts a two-place decimal amount, e.g. `12.345` becomes 1235 cents.
    pub fn from_decimal(amount: Decimal) -> Result<Self, MoneyError> {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let cents = rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|c| c.to_i64())
            .ok_or(MoneyError::OutOfRange(amount))?;
        Ok(Self { cents })
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.cents, 2)
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Unit price times quantity.
    pub fn multiply(&self, quantity: u32) -> Result<Self, MoneyError> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Self::from_cents)
            .ok_or(MoneyError::Overflow)
    }

    pub fn checked_add(self, rhs: Money) -> Result<Self, MoneyError> {
        self.cents
            .checked_add(rhs.cents)
            .map(Self::from_cents)
            .ok_or(MoneyError::Overflow)
    }

    /// Adds up `amounts`, failing on the first overflow.
    pub fn try_sum<I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Result<Money, MoneyError>>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |total, amount| total.checked_add(amount?))
    }

    /// The amount after taking `percent` off, rounded to the cent.
    ///
    /// `percent` of zero means no discount and yields zero, matching how
    /// listings report "no discounted price".
    pub fn percent_off(&self, percent: u8) -> Self {
        if percent == 0 {
            return Self::zero();
        }
        let price = self.to_decimal();
        let discounted = price - price * Decimal::from(percent) / Decimal::ONE_HUNDRED;
        let rounded =
            discounted.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self {
            cents: (rounded * Decimal::ONE_HUNDRED).to_i64().unwrap_or(self.cents),
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Lower-case ISO 4217 code, as payment providers expect it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn parse(code: &str) -> Result<Self, MoneyError> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MoneyError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(code.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self("eur".to_string())
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn from_decimal_rounds_half_away_from_zero() {
        assert_eq!(Money::from_decimal(dec("12.345")).unwrap().cents(), 1235);
        assert_eq!(Money::from_decimal(dec("12.344")).unwrap().cents(), 1234);
        assert_eq!(Money::from_decimal(dec("-0.005")).unwrap().cents(), -1);
        assert_eq!(Money::from_decimal(dec("10")).unwrap().cents(), 1000);
    }

    #[test]
    fn from_decimal_out_of_range() {
        assert!(matches!(
            Money::from_decimal(Decimal::MAX),
            Err(MoneyError::OutOfRange(_))
        ));
    }

    #[test]
    fn arithmetic() {
        let price = Money::from_cents(1999);
        assert_eq!(price.multiply(3).unwrap().cents(), 5997);
        assert_eq!(price.checked_add(Money::from_cents(1)).unwrap().cents(), 2000);
        let total = Money::try_sum([1, 2, 3].into_iter().map(|c| Ok(Money::from_cents(c)))).unwrap();
        assert_eq!(total.cents(), 6);
    }

    #[test]
    fn arithmetic_overflow_is_an_error() {
        let price = Money::from_decimal(dec("90000000000000000")).unwrap();
        assert_eq!(price.multiply(2), Err(MoneyError::Overflow));
        assert_eq!(
            Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)),
            Err(MoneyError::Overflow)
        );
        let lines = [Ok(Money::from_cents(i64::MAX)), Ok(Money::from_cents(1))];
        assert_eq!(Money::try_sum(lines), Err(MoneyError::Overflow));
    }

    #[test]
    fn percent_off() {
        assert_eq!(Money::from_cents(1000).percent_off(10).cents(), 900);
        // 19.99 * 0.85 = 16.9915
        assert_eq!(Money::from_cents(1999).percent_off(15).cents(), 1699);
        // 0.05 * 0.5 = 0.025
        assert_eq!(Money::from_cents(5).percent_off(50).cents(), 3);
        assert!(Money::from_cents(1000).percent_off(0).is_zero());
    }

    #[test]
    fn display_uses_two_places() {
        assert_eq!(Money::from_cents(1205).to_string(), "12.05");
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
    }

    #[test]
    fn currency_parsing() {
        assert_eq!(Currency::parse("EUR").unwrap().as_str(), "eur");
        assert_eq!(Currency::parse(" usd ").unwrap().as_str(), "usd");
        assert!(Currency::parse("euro").is_err());
        assert!(Currency::parse("e1r").is_err());
        assert_eq!(Currency::default().as_str(), "eur");
    }
}
