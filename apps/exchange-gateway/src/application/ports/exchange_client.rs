//! Exchange Client Port (Driven Port)
//!
//! Raw capability set of one exchange. One implementation per exchange; the
//! shared classification, retry and reconciliation logic lives outside it.
//! Every method returns the raw failure so the classifier can decide.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Fill, OrderId, OrderSide, Pair, Ticker};
use crate::resilience::RawError;

/// An order the exchange lists as open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    /// Exchange-assigned id.
    pub id: OrderId,
    /// Order side.
    pub side: OrderSide,
    /// Limit price.
    pub price: Decimal,
    /// Amount requested at placement.
    pub starting_amount: Decimal,
    /// Amount not yet executed.
    pub remaining_amount: Decimal,
    /// Creation time, when the exchange reports one.
    pub created_at: Option<DateTime<Utc>>,
}

impl OpenOrder {
    /// Executed part of the order, never negative.
    #[must_use]
    pub fn filled_amount(&self) -> Decimal {
        (self.starting_amount - self.remaining_amount).max(Decimal::ZERO)
    }
}

/// One of the account's own trades on the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Order the trade executed against, if reported.
    pub order_id: Option<OrderId>,
    /// Trade side.
    pub side: OrderSide,
    /// Executed amount.
    pub amount: Decimal,
    /// Execution rate.
    pub rate: Decimal,
    /// Execution time.
    pub timestamp: DateTime<Utc>,
}

/// Raw exchange capabilities for one pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Best bid and ask.
    async fn fetch_ticker(&self, pair: &Pair) -> Result<Ticker, RawError>;

    /// Free balances keyed by symbol.
    async fn fetch_balances(&self, pair: &Pair) -> Result<HashMap<String, Decimal>, RawError>;

    /// Place a limit order and return the exchange-assigned id.
    async fn place_order(
        &self,
        pair: &Pair,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    ) -> Result<OrderId, RawError>;

    /// Currently open orders on the pair.
    async fn fetch_open_orders(&self, pair: &Pair) -> Result<Vec<OpenOrder>, RawError>;

    /// Fills of one order, oldest first.
    async fn fetch_order_trades(&self, pair: &Pair, id: &OrderId) -> Result<Vec<Fill>, RawError>;

    /// Cancel an open order.
    async fn cancel_order(&self, pair: &Pair, id: &OrderId) -> Result<(), RawError>;

    /// Own trades on the pair, optionally only those at or after `since`.
    async fn fetch_trade_history(
        &self,
        pair: &Pair,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<TradeRecord>, RawError>;
}
