//! Market configuration: the traded pair, its limits and the fee.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{MarketDescriptor, Pair};
use crate::error::ExchangeError;

/// Market configuration for one adapter instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Quote currency symbol (e.g. "USDT").
    pub currency: String,
    /// Traded asset symbol (e.g. "BTC").
    pub asset: String,
    /// Minimum order amount in asset units.
    #[serde(default)]
    pub min_amount: Decimal,
    /// Amount precision step.
    pub amount_tick: Decimal,
    /// Price precision step.
    pub price_tick: Decimal,
    /// Maker fee as a fraction (0.002 = 0.2%).
    #[serde(default = "default_fee")]
    pub fee: Decimal,
}

impl MarketConfig {
    /// The configured pair.
    #[must_use]
    pub fn pair(&self) -> Pair {
        Pair::new(self.currency.as_str(), self.asset.as_str())
    }

    /// The configured market limits.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::InvalidMarket`] for non-positive ticks or a
    /// negative minimum.
    pub fn descriptor(&self) -> Result<MarketDescriptor, ExchangeError> {
        MarketDescriptor::new(self.min_amount, self.amount_tick, self.price_tick)
    }
}

fn default_fee() -> Decimal {
    Decimal::new(2, 3)
}
