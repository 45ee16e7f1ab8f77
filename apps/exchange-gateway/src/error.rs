//! Error types returned by gateway operations.
//!
//! | Variant | Source | Retried internally |
//! |---------|--------|--------------------|
//! | `Rejected` | fatal classification | no |
//! | `AccessBlocked` | anti-bot challenge page | no |
//! | `RetriesExhausted` | retryable classification, budget spent | yes, until exhausted |
//! | `PlacementUnconfirmed` | ambiguous placement, no matching order found | no |
//! | `UnexpectedResponse` | marker returned where data was required | no |
//! | `InvalidOrder` / `InvalidMarket` | local validation before any call | no |

use thiserror::Error;

use crate::resilience::OperationKind;

/// Errors surfaced to the strategy layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// The exchange refused the request for a non-transient reason.
    #[error("{operation} rejected by exchange: {reason}")]
    Rejected {
        /// Operation that failed.
        operation: OperationKind,
        /// Exchange-provided reason.
        reason: String,
    },

    /// The exchange answered with an anti-bot challenge page.
    #[error("{operation} blocked by an access challenge, operator action required: {reason}")]
    AccessBlocked {
        /// Operation that failed.
        operation: OperationKind,
        /// Detected challenge signature.
        reason: String,
    },

    /// Transient failures persisted past the retry budget.
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Operation that failed.
        operation: OperationKind,
        /// Calls made.
        attempts: u32,
        /// Reason of the final attempt.
        last_error: String,
    },

    /// A placement timed out ambiguously and no matching order was found.
    #[error("order placement could not be confirmed: {reason}")]
    PlacementUnconfirmed {
        /// The original ambiguous error.
        reason: String,
    },

    /// The exchange answered with something this operation cannot use.
    #[error("{operation} returned an unexpected response: {reason}")]
    UnexpectedResponse {
        /// Operation that failed.
        operation: OperationKind,
        /// What was wrong with the response.
        reason: String,
    },

    /// The order failed local validation and was never sent.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Market limits are unusable.
    #[error("invalid market descriptor: {0}")]
    InvalidMarket(String),

    /// The HTTP transport could not be built.
    #[error("transport setup failed: {0}")]
    Transport(String),
}

impl ExchangeError {
    /// Whether an operator has to act (credentials, request shape, access block).
    #[must_use]
    pub const fn requires_operator(&self) -> bool {
        matches!(
            self,
            Self::Rejected { .. } | Self::AccessBlocked { .. } | Self::Transport(_)
        )
    }

    /// The operation the error belongs to, when it came from an exchange call.
    #[must_use]
    pub const fn operation(&self) -> Option<OperationKind> {
        match self {
            Self::Rejected { operation, .. }
            | Self::AccessBlocked { operation, .. }
            | Self::RetriesExhausted { operation, .. }
            | Self::UnexpectedResponse { operation, .. } => Some(*operation),
            Self::PlacementUnconfirmed { .. } => Some(OperationKind::PlaceOrder),
            Self::InvalidOrder(_) | Self::InvalidMarket(_) | Self::Transport(_) => None,
        }
    }
}
