//! Canonical order view: side, lifecycle state and the order entity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::pair::OrderId;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy the asset with the currency.
    Buy,
    /// Sell the asset for the currency.
    Sell,
}

impl OrderSide {
    /// Lowercase wire name used by most exchange APIs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Canonical state of a placed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "filled_amount", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Listed as open with nothing filled yet.
    Open,
    /// Listed as open with part of the requested amount filled.
    PartiallyFilled(Decimal),
    /// No longer listed as open.
    Filled,
    /// The exchange does not know the order (never matched).
    Unknown,
}

impl OrderState {
    /// Whether the order still rests on the book.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open | Self::PartiallyFilled(_))
    }

    /// Whether the order has been completely executed.
    #[must_use]
    pub const fn is_executed(&self) -> bool {
        matches!(self, Self::Filled)
    }

    /// Amount filled so far, when the exchange reports it.
    #[must_use]
    pub const fn filled_amount(&self) -> Option<Decimal> {
        match self {
            Self::Open => Some(Decimal::ZERO),
            Self::PartiallyFilled(amount) => Some(*amount),
            Self::Filled | Self::Unknown => None,
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::PartiallyFilled(amount) => write!(f, "PARTIALLY_FILLED({amount})"),
            Self::Filled => write!(f, "FILLED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// An order the exchange has confirmed (directly or through reconciliation).
///
/// Never deleted locally; only its state moves as status queries come in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    side: OrderSide,
    amount: Decimal,
    price: Decimal,
    state: OrderState,
}

impl Order {
    /// Create an order that was just placed.
    #[must_use]
    pub const fn placed(id: OrderId, side: OrderSide, amount: Decimal, price: Decimal) -> Self {
        Self {
            id,
            side,
            amount,
            price,
            state: OrderState::Open,
        }
    }

    /// Exchange-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Requested amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Requested limit price.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Last resolved state.
    #[must_use]
    pub const fn state(&self) -> OrderState {
        self.state
    }

    pub(crate) const fn refresh(&mut self, state: OrderState) {
        self.state = state;
    }
}
