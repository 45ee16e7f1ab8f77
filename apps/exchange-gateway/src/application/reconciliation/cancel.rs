//! Cancel reconciliation.
//!
//! A cancel can lose the race against execution. The exchange then rejects
//! it as "invalid order"; the classifier turns that into the `AlreadyFilled`
//! marker and this module reports it as `filled = true` instead of an error.

use serde::{Deserialize, Serialize};

use crate::application::ports::ExchangeClient;
use crate::domain::{OrderId, Pair};
use crate::error::ExchangeError;
use crate::observability::metrics;
use crate::resilience::{OperationKind, OutcomeClassifier, Payload, RetryScheduler};

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOutcome {
    /// The order had already executed and could not be cancelled.
    pub filled: bool,
}

impl CancelOutcome {
    /// Map a classified cancel payload.
    #[must_use]
    pub const fn from_payload(payload: &Payload<()>) -> Self {
        Self {
            filled: matches!(payload, Payload::AlreadyFilled),
        }
    }
}

/// Cancels one order, disambiguating "already filled" from real failures.
pub struct CancelReconciler<'a, C: ?Sized> {
    client: &'a C,
    pair: &'a Pair,
    classifier: &'a OutcomeClassifier,
    scheduler: &'a RetryScheduler,
}

impl<'a, C: ExchangeClient + ?Sized> CancelReconciler<'a, C> {
    /// Create a reconciler over one client and pair.
    #[must_use]
    pub const fn new(
        client: &'a C,
        pair: &'a Pair,
        classifier: &'a OutcomeClassifier,
        scheduler: &'a RetryScheduler,
    ) -> Self {
        Self {
            client,
            pair,
            classifier,
            scheduler,
        }
    }

    /// Cancel the order.
    ///
    /// # Errors
    ///
    /// Any failure other than "already filled" propagates unchanged.
    pub async fn cancel(&self, id: &OrderId) -> Result<CancelOutcome, ExchangeError> {
        let payload = self
            .scheduler
            .run(OperationKind::CancelOrder, || async {
                self.classifier.classify(
                    OperationKind::CancelOrder,
                    self.client.cancel_order(self.pair, id).await,
                )
            })
            .await?;

        let outcome = CancelOutcome::from_payload(&payload);
        if outcome.filled {
            tracing::info!(
                pair = %self.pair,
                order_id = %id,
                "Cancel lost the race, order already filled"
            );
        } else {
            tracing::info!(pair = %self.pair, order_id = %id, "Order cancelled");
        }
        metrics::record_cancel(outcome.filled);

        Ok(outcome)
    }
}
