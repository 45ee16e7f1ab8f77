//! Order state resolution.
//!
//! Open-order listings and fill records are eventually consistent views of
//! one order; this module reduces them to an [`OrderState`] and a
//! [`FillSummary`].
//!
//! | Listing | State |
//! |---------|-------|
//! | listed, nothing filled | `Open` |
//! | listed, partly filled | `PartiallyFilled(requested - remaining)` |
//! | not listed | `Filled` |
//! | exchange says "order not found" | `Unknown` |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::OpenOrder;
use crate::domain::{Fill, FillSummary, Order, OrderId, OrderState};
use crate::resilience::Payload;

/// Answer to "is this order still open".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOrderResult {
    /// Completely executed.
    pub executed: bool,
    /// Still resting on the book.
    pub open: bool,
    /// Filled so far, when known.
    pub filled_amount: Option<Decimal>,
}

impl From<OrderState> for CheckOrderResult {
    fn from(state: OrderState) -> Self {
        Self {
            executed: state.is_executed(),
            open: state.is_open(),
            filled_amount: state.filled_amount(),
        }
    }
}

/// Stateless resolver from exchange listings to canonical order state.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderStateResolver;

impl OrderStateResolver {
    /// Resolve an order against the current open-order listing.
    ///
    /// Absence from the listing means the order was filled.
    #[must_use]
    pub fn resolve(id: &OrderId, open_orders: &[OpenOrder]) -> OrderState {
        open_orders
            .iter()
            .find(|order| &order.id == id)
            .map_or(OrderState::Filled, |order| {
                let filled = order.filled_amount();
                if filled > Decimal::ZERO {
                    OrderState::PartiallyFilled(filled)
                } else {
                    OrderState::Open
                }
            })
    }

    /// Resolve from a classified listing, where `Unfilled` means the
    /// exchange does not know the order.
    #[must_use]
    pub fn resolve_payload(id: &OrderId, listing: &Payload<Vec<OpenOrder>>) -> OrderState {
        match listing {
            Payload::Data(open_orders) => Self::resolve(id, open_orders),
            Payload::Unfilled | Payload::AlreadyFilled => OrderState::Unknown,
        }
    }

    /// Reduce an order's classified fill history to its VWAP summary.
    #[must_use]
    pub fn summarize(fills: &Payload<Vec<Fill>>) -> FillSummary {
        match fills {
            Payload::Data(fills) => FillSummary::from_fills(fills),
            Payload::Unfilled | Payload::AlreadyFilled => FillSummary::unfilled(),
        }
    }

    /// Move a tracked order to its freshly resolved state.
    pub fn apply(order: &mut Order, state: OrderState) {
        if order.state() != state {
            tracing::debug!(
                order_id = %order.id(),
                from = %order.state(),
                to = %state,
                "Order state changed"
            );
        }
        order.refresh(state);
    }
}
