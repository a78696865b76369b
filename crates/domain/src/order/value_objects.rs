//! Value objects for the order domain.

use common::SkuCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::OrderError;

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

/// Error returned when a decimal amount cannot be represented as [`Money`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal amount: {0:?}")]
pub struct ParseMoneyError(String);

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a dollar value.
    pub fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars.saturating_mul(100),
        }
    }

    /// Parses a decimal string such as `"10.00"`, `"5"` or `"-3.5"`.
    ///
    /// At most two fractional digits are accepted; anything finer cannot be
    /// represented in cents and is rejected rather than rounded.
    pub fn parse_decimal(input: &str) -> Result<Self, ParseMoneyError> {
        let err = || ParseMoneyError(input.to_string());
        let trimmed = input.trim();

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (unsigned, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let whole: i64 = whole.parse().map_err(|_| err())?;
        let fraction_cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| err())? * 10,
            _ => fraction.parse().map_err(|_| err())?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction_cents))
            .ok_or_else(err)?;

        Ok(Self {
            cents: if negative { -cents } else { cents },
        })
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, saturating at the bounds of `i64` cents.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(i64::from(quantity)),
        }
    }

    /// Multiplies by a quantity, or `None` if the result does not fit.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds two amounts, or `None` if the result does not fit.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }

    /// Renders the amount as a plain decimal string, e.g. `"10.00"`.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.cents < 0 { "-" } else { "" };
        format!("{sign}{}.{:02}", self.dollars().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::str::FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_decimal(s)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents = self.cents.saturating_add(rhs.cents);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A single line of an order. Owned by its order; has no lifecycle of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The product being ordered.
    pub sku: SkuCode,

    /// Price per unit.
    pub unit_price: Money,

    /// Quantity ordered, always positive.
    pub quantity: u32,
}

impl LineItem {
    /// Creates a validated line item.
    pub fn new(
        sku: impl Into<SkuCode>,
        unit_price: Money,
        quantity: u32,
    ) -> Result<Self, OrderError> {
        let sku = sku.into();

        if sku.is_blank() {
            return Err(OrderError::EmptySku);
        }

        if quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                sku: sku.to_string(),
                quantity,
            });
        }

        if unit_price.is_negative() {
            return Err(OrderError::NegativePrice {
                sku: sku.to_string(),
                price: unit_price,
            });
        }

        if unit_price.checked_multiply(quantity).is_none() {
            return Err(OrderError::AmountOverflow {
                sku: sku.to_string(),
            });
        }

        Ok(Self {
            sku,
            unit_price,
            quantity,
        })
    }

    /// Returns the total price for this line (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}
