//! Exchange adapter: the strategy-facing facade.
//!
//! Every operation wraps an [`ExchangeClient`] call in a [`RetryScheduler`],
//! classifies each attempt and, for placement, cancellation and status,
//! routes the result through the matching reconciler.
//!
//! | Operation | Policy | Reconciliation |
//! |-----------|--------|----------------|
//! | `get_ticker`, `get_portfolio` | best effort | none |
//! | `buy`, `sell` | critical | placement on ambiguous result |
//! | `check_order`, `get_order` | polling | order state resolver |
//! | `cancel_order` | critical | cancel reconciler |
//!
//! The adapter keeps no per-request state, so concurrent calls on one
//! instance do not interfere.

use chrono::Utc;
use rust_decimal::Decimal;

use super::ports::ExchangeClient;
use super::reconciliation::{
    CancelOutcome, CancelReconciler, CheckOrderResult, OrderStateResolver, PlacementIntent,
    PlacementReconciler, ReconciliationSettings,
};
use crate::config::Config;
use crate::domain::{
    FillSummary, MarketDescriptor, Order, OrderId, OrderSide, OrderState, Pair, Portfolio, Ticker,
};
use crate::error::ExchangeError;
use crate::observability::metrics;
use crate::resilience::{OperationKind, OutcomeClassifier, Payload, RetryPolicy, RetryScheduler};

/// Retry policies used by the adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterPolicies {
    /// Placement and cancellation.
    pub critical: RetryPolicy,
    /// Ticker and balances.
    pub best_effort: RetryPolicy,
    /// Order status and fills.
    pub polling: RetryPolicy,
}

impl Default for AdapterPolicies {
    fn default() -> Self {
        Self {
            critical: RetryPolicy::critical(),
            best_effort: RetryPolicy::best_effort(),
            polling: RetryPolicy::forever(),
        }
    }
}

/// Strategy-facing adapter for one exchange and one pair.
pub struct ExchangeAdapter<C> {
    client: C,
    pair: Pair,
    market: MarketDescriptor,
    fee: Decimal,
    classifier: OutcomeClassifier,
    critical: RetryScheduler,
    best_effort: RetryScheduler,
    polling: RetryScheduler,
    reconciliation: ReconciliationSettings,
}

impl<C: ExchangeClient> ExchangeAdapter<C> {
    /// Create an adapter with default policies, a zero fee and the built-in
    /// classifier tables.
    #[must_use]
    pub fn new(client: C, pair: Pair, market: MarketDescriptor) -> Self {
        let policies = AdapterPolicies::default();
        Self {
            client,
            pair,
            market,
            fee: Decimal::ZERO,
            classifier: OutcomeClassifier::default(),
            critical: RetryScheduler::new(policies.critical),
            best_effort: RetryScheduler::new(policies.best_effort),
            polling: RetryScheduler::new(policies.polling),
            reconciliation: ReconciliationSettings::default(),
        }
    }

    /// Create an adapter from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::InvalidMarket`] if the market limits are unusable.
    pub fn from_config(client: C, config: &Config) -> Result<Self, ExchangeError> {
        let market = config.market.descriptor()?;
        let retry = &config.retry;

        Ok(Self::new(client, config.market.pair(), market)
            .with_fee(config.market.fee)
            .with_policies(AdapterPolicies {
                critical: retry.critical_policy(),
                best_effort: retry.best_effort_policy(),
                polling: retry.polling_policy(),
            })
            .with_reconciliation(config.reconciliation.to_settings(retry.lookup_policy())))
    }

    /// Set the maker fee fraction.
    #[must_use]
    pub const fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = fee;
        self
    }

    /// Replace the retry policies.
    #[must_use]
    pub fn with_policies(mut self, policies: AdapterPolicies) -> Self {
        self.critical = RetryScheduler::new(policies.critical);
        self.best_effort = RetryScheduler::new(policies.best_effort);
        self.polling = RetryScheduler::new(policies.polling);
        self
    }

    /// Replace the placement reconciliation settings.
    #[must_use]
    pub fn with_reconciliation(mut self, settings: ReconciliationSettings) -> Self {
        self.reconciliation = settings;
        self
    }

    /// Replace the outcome classifier (e.g. with exchange-specific signatures).
    #[must_use]
    pub fn with_classifier(mut self, classifier: OutcomeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// The pair every request is keyed by.
    #[must_use]
    pub const fn pair(&self) -> &Pair {
        &self.pair
    }

    /// The market limits.
    #[must_use]
    pub const fn market(&self) -> &MarketDescriptor {
        &self.market
    }

    /// The underlying exchange client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Best bid and ask.
    ///
    /// # Errors
    ///
    /// Returns the classified failure once the best-effort budget is spent.
    pub async fn get_ticker(&self) -> Result<Ticker, ExchangeError> {
        let op = OperationKind::Ticker;
        self.best_effort
            .run(op, || async {
                self.classifier
                    .classify(op, self.client.fetch_ticker(&self.pair).await)
            })
            .await?
            .into_data(op)
    }

    /// Free balances of the pair's currency and asset.
    ///
    /// # Errors
    ///
    /// Returns the classified failure once the best-effort budget is spent.
    pub async fn get_portfolio(&self) -> Result<Portfolio, ExchangeError> {
        let op = OperationKind::Balances;
        let balances = self
            .best_effort
            .run(op, || async {
                self.classifier
                    .classify(op, self.client.fetch_balances(&self.pair).await)
            })
            .await?
            .into_data(op)?;

        Ok(Portfolio::from_balances(&self.pair, &balances))
    }

    /// Maker fee as a fraction.
    #[must_use]
    pub const fn get_fee(&self) -> Decimal {
        self.fee
    }

    /// Truncate an amount to the market's amount tick.
    #[must_use]
    pub fn round_amount(&self, amount: Decimal) -> Decimal {
        self.market.round_amount(amount)
    }

    /// Truncate a price to the market's price tick.
    #[must_use]
    pub fn round_price(&self, price: Decimal) -> Decimal {
        self.market.round_price(price)
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Place a limit buy order.
    ///
    /// # Errors
    ///
    /// See [`place`](Self::place).
    pub async fn buy(&self, amount: Decimal, price: Decimal) -> Result<OrderId, ExchangeError> {
        self.place(OrderSide::Buy, amount, price).await
    }

    /// Place a limit sell order.
    ///
    /// # Errors
    ///
    /// See [`place`](Self::place).
    pub async fn sell(&self, amount: Decimal, price: Decimal) -> Result<OrderId, ExchangeError> {
        self.place(OrderSide::Sell, amount, price).await
    }

    /// Round, validate and place a limit order.
    ///
    /// An ambiguous failure is never retried; the order is looked up instead
    /// and its id returned when found.
    ///
    /// # Errors
    ///
    /// - [`ExchangeError::InvalidOrder`] below the market minimum or at a zero price
    /// - [`ExchangeError::PlacementUnconfirmed`] when an ambiguous placement
    ///   cannot be matched
    /// - any fatal or exhausted classification
    pub async fn place(
        &self,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    ) -> Result<OrderId, ExchangeError> {
        let amount = self.round_amount(amount);
        let price = self.round_price(price);

        if !self.market.meets_minimum(amount) {
            metrics::record_local_rejection("below_minimum");
            return Err(ExchangeError::InvalidOrder(format!(
                "amount {amount} below market minimum {}",
                self.market.min_amount()
            )));
        }
        if price <= Decimal::ZERO {
            metrics::record_local_rejection("zero_price");
            return Err(ExchangeError::InvalidOrder(format!(
                "price must be positive after rounding, got {price}"
            )));
        }

        let intent = PlacementIntent {
            side,
            amount,
            price,
            issued_at: Utc::now(),
        };
        let reconciler = PlacementReconciler::new(
            &self.client,
            &self.pair,
            &self.market,
            &self.classifier,
            &self.reconciliation,
        );

        let op = OperationKind::PlaceOrder;
        let id = self
            .critical
            .run_resolving(
                op,
                || async {
                    let placed = self.client.place_order(&self.pair, side, amount, price).await;
                    self.classifier.classify(op, placed)
                },
                |reason| async move {
                    reconciler.reconcile(&intent, reason).await.map(Payload::Data)
                },
            )
            .await?
            .into_data(op)?;

        tracing::info!(
            pair = %self.pair,
            order_id = %id,
            side = %side,
            amount = %amount,
            price = %price,
            "Order placed"
        );
        Ok(id)
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Resolve the current state of an order.
    ///
    /// # Errors
    ///
    /// Returns the classified failure once the polling budget is spent.
    pub async fn order_state(&self, id: &OrderId) -> Result<OrderState, ExchangeError> {
        let op = OperationKind::CheckOrder;
        let listing = self
            .polling
            .run(op, || async {
                self.classifier
                    .classify(op, self.client.fetch_open_orders(&self.pair).await)
            })
            .await?;

        Ok(OrderStateResolver::resolve_payload(id, &listing))
    }

    /// Is the order still open, and how much of it is filled.
    ///
    /// "Order not found" answers `{executed: false, open: false}`, never an error.
    ///
    /// # Errors
    ///
    /// Returns the classified failure once the polling budget is spent.
    pub async fn check_order(&self, id: &OrderId) -> Result<CheckOrderResult, ExchangeError> {
        self.order_state(id).await.map(CheckOrderResult::from)
    }

    /// Refresh a tracked order with its current state.
    ///
    /// # Errors
    ///
    /// Returns the classified failure once the polling budget is spent.
    pub async fn refresh_order(&self, order: &mut Order) -> Result<OrderState, ExchangeError> {
        let state = self.order_state(order.id()).await?;
        OrderStateResolver::apply(order, state);
        Ok(state)
    }

    /// Volume-weighted fill summary of an order.
    ///
    /// An order the exchange does not know yields a zero summary.
    ///
    /// # Errors
    ///
    /// Returns the classified failure once the polling budget is spent.
    pub async fn get_order(&self, id: &OrderId) -> Result<FillSummary, ExchangeError> {
        let op = OperationKind::GetOrder;
        let fills = self
            .polling
            .run(op, || async {
                self.classifier
                    .classify(op, self.client.fetch_order_trades(&self.pair, id).await)
            })
            .await?;

        Ok(OrderStateResolver::summarize(&fills))
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Cancel an order; `filled` reports that it executed first.
    ///
    /// # Errors
    ///
    /// Any failure other than "already filled".
    pub async fn cancel_order(&self, id: &OrderId) -> Result<CancelOutcome, ExchangeError> {
        CancelReconciler::new(&self.client, &self.pair, &self.classifier, &self.critical)
            .cancel(id)
            .await
    }
}
