//! Canonical classification of one exchange call attempt.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ExchangeError;

/// The logical exchange operation a call belongs to.
///
/// Classification overrides and retry policies are chosen per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Best bid/ask.
    Ticker,
    /// Account balances.
    Balances,
    /// Order placement.
    PlaceOrder,
    /// Open-order status check.
    CheckOrder,
    /// Fill history of one order.
    GetOrder,
    /// Order cancellation.
    CancelOrder,
    /// Open-order look-up during placement reconciliation.
    RecentOrders,
    /// Trade-history look-up during placement reconciliation.
    TradeHistory,
}

impl OperationKind {
    /// Stable snake_case name, used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::Balances => "balances",
            Self::PlaceOrder => "place_order",
            Self::CheckOrder => "check_order",
            Self::GetOrder => "get_order",
            Self::CancelOrder => "cancel_order",
            Self::RecentOrders => "recent_orders",
            Self::TradeHistory => "trade_history",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful payload: either data or an explicit marker produced by an
/// operation-specific override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<T> {
    /// Structured data returned by the exchange.
    Data(T),
    /// "Order not found" on an order look-up: it never matched.
    Unfilled,
    /// "Invalid order number" on a cancel: it already executed.
    AlreadyFilled,
}

impl<T> Payload<T> {
    /// Unwrap the data, treating a marker as an unexpected response.
    pub fn into_data(self, operation: OperationKind) -> Result<T, ExchangeError> {
        match self {
            Self::Data(data) => Ok(data),
            Self::Unfilled | Self::AlreadyFilled => Err(ExchangeError::UnexpectedResponse {
                operation,
                reason: format!("{} marker carries no data", self.marker_name()),
            }),
        }
    }

    const fn marker_name(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::Unfilled => "unfilled",
            Self::AlreadyFilled => "already_filled",
        }
    }
}

/// Why a call is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalReason {
    /// Any non-recoverable exchange error.
    Rejected(String),
    /// Anti-bot challenge page; needs operator action, never retried.
    AccessBlocked(String),
}

impl FatalReason {
    /// Convert into the error surfaced to callers.
    #[must_use]
    pub fn into_error(self, operation: OperationKind) -> ExchangeError {
        match self {
            Self::Rejected(reason) => ExchangeError::Rejected { operation, reason },
            Self::AccessBlocked(reason) => ExchangeError::AccessBlocked { operation, reason },
        }
    }
}

/// Result of classifying one call attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The call succeeded (possibly via an override marker).
    Success(Payload<T>),
    /// Not worth retrying.
    FatalError(FatalReason),
    /// Transient infrastructure fault.
    RetryableError(String),
    /// Placement may or may not have executed.
    AmbiguousResult(String),
}

impl<T> Outcome<T> {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::FatalError(_) => "fatal",
            Self::RetryableError(_) => "retryable",
            Self::AmbiguousResult(_) => "ambiguous",
        }
    }
}
