//! Per-pair market limits used to round orders before submission.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;

/// Minimal order size and tick sizes for one pair.
///
/// Rounding truncates toward zero: a rounded amount or price never exceeds
/// what the caller asked for, so funds are never over-committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDescriptor {
    min_amount: Decimal,
    amount_tick: Decimal,
    price_tick: Decimal,
}

impl MarketDescriptor {
    /// Create a descriptor, rejecting non-positive ticks and negative minimums.
    pub fn new(
        min_amount: Decimal,
        amount_tick: Decimal,
        price_tick: Decimal,
    ) -> Result<Self, ExchangeError> {
        if amount_tick <= Decimal::ZERO || price_tick <= Decimal::ZERO {
            return Err(ExchangeError::InvalidMarket(format!(
                "ticks must be positive (amount_tick={amount_tick}, price_tick={price_tick})"
            )));
        }
        if min_amount < Decimal::ZERO {
            return Err(ExchangeError::InvalidMarket(format!(
                "min_amount must not be negative, got {min_amount}"
            )));
        }

        Ok(Self {
            min_amount: min_amount.normalize(),
            amount_tick: amount_tick.normalize(),
            price_tick: price_tick.normalize(),
        })
    }

    /// Smallest order amount the exchange accepts.
    #[must_use]
    pub const fn min_amount(&self) -> Decimal {
        self.min_amount
    }

    /// Amount increment.
    #[must_use]
    pub const fn amount_tick(&self) -> Decimal {
        self.amount_tick
    }

    /// Price increment.
    #[must_use]
    pub const fn price_tick(&self) -> Decimal {
        self.price_tick
    }

    /// Round an amount down to the amount tick.
    #[must_use]
    pub fn round_amount(&self, amount: Decimal) -> Decimal {
        truncate_to_tick(amount, self.amount_tick)
    }

    /// Round a price down to the price tick.
    #[must_use]
    pub fn round_price(&self, price: Decimal) -> Decimal {
        truncate_to_tick(price, self.price_tick)
    }

    /// Check whether an (already rounded) amount meets the minimum order size.
    #[must_use]
    pub fn meets_minimum(&self, amount: Decimal) -> bool {
        amount > Decimal::ZERO && amount >= self.min_amount
    }
}

/// Remove the remainder modulo `tick`; exact, unlike dividing and truncating.
///
/// When the remainder cannot be represented at the tick's scale the value
/// is truncated to that scale instead, which still never rounds up.
fn truncate_to_tick(value: Decimal, tick: Decimal) -> Decimal {
    value
        .checked_rem(tick)
        .and_then(|remainder| value.checked_sub(remainder))
        .unwrap_or_else(|| value.trunc_with_scale(tick.scale()))
}
