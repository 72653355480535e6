//! Value Objects for the shop

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest SKU the `product_variants.sku` column accepts.
pub const SKU_MAX_LEN: usize = 50;

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.chars().count() > SKU_MAX_LEN { return Err(SkuError::TooLong(value)); }
        if let Some(c) = value.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-')) {
            return Err(SkuError::InvalidChar(c));
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for Sku {
    type Error = SkuError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self { sku.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkuError {
    #[error("SKU empty")]
    Empty,
    #[error("SKU {0} is longer than {SKU_MAX_LEN} characters")]
    TooLong(String),
    #[error("SKU contains invalid character {0:?}")]
    InvalidChar(char),
    #[error("could not find a free SKU after {0} attempts")]
    Exhausted(u32),
}

/// Rounds a price or impact figure to two decimal places.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount: round2(amount), currency: currency.to_string() } }
    pub fn gbp(amount: Decimal) -> Self { Self::new(amount, "GBP") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch { left: self.currency.clone(), right: other.currency.clone() });
        }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }
}

impl Default for Money { fn default() -> Self { Self::zero("GBP") } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2} {}", self.amount, self.currency) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },
}

/// Environmental impact in kg CO₂e.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Impact(Decimal);

impl Impact {
    pub const ZERO: Impact = Impact(Decimal::ZERO);
    pub fn new(kg: Decimal) -> Self { Self(round2(kg)) }
    pub fn kg(&self) -> Decimal { self.0 }
    pub fn add(&self, other: Impact) -> Self { Self::new(self.0 + other.0) }
    pub fn multiply(&self, qty: u32) -> Self { Self::new(self.0 * Decimal::from(qty)) }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
    /// Whether `self` units can be taken from a row holding `stock`.
    pub fn fits_in(&self, stock: i32) -> bool { i64::from(self.0) <= i64::from(stock.max(0)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku() { let sku = Sku::new("glv-fg-m-abcd").unwrap(); assert_eq!(sku.as_str(), "GLV-FG-M-ABCD"); }

    #[test]
    fn test_sku_rejects_bad_input() {
        assert_eq!(Sku::new("  "), Err(SkuError::Empty));
        assert_eq!(Sku::new("GLV FG"), Err(SkuError::InvalidChar(' ')));
        assert!(matches!(Sku::new("A".repeat(51)), Err(SkuError::TooLong(_))));
    }

    #[test]
    fn test_money_add() {
        let a = Money::gbp(Decimal::new(100, 0));
        let b = Money::gbp(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert!(a.add(&Money::new(Decimal::ONE, "EUR")).is_err());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round2(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(Impact::new(Decimal::new(1005, 3)).kg(), Decimal::new(101, 2));
        assert_eq!(Money::gbp(Decimal::new(3333, 3)).multiply(3).amount(), Decimal::new(999, 2));
    }

    #[test]
    fn test_quantity_fits_in_stock() {
        assert!(Quantity::new(10).fits_in(10));
        assert!(!Quantity::new(11).fits_in(10));
        assert!(!Quantity::new(1).fits_in(-3));
    }
}
