//! Placement reconciliation.
//!
//! A placement that timed out may or may not have reached the exchange.
//! Instead of placing again (and risking a duplicate), wait a moment and look
//! for the order among recent open orders, then among recent own trades.
//! No match means the ambiguous error surfaces as a failure.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use crate::application::ports::{ExchangeClient, OpenOrder, TradeRecord};
use crate::domain::{MarketDescriptor, OrderId, OrderSide, Pair};
use crate::error::ExchangeError;
use crate::observability::metrics;
use crate::resilience::{OperationKind, OutcomeClassifier, RetryPolicy, RetryScheduler};

/// Timing of placement reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationSettings {
    /// Wait before the first look-up, giving the exchange time to list the order.
    pub recheck_delay: Duration,
    /// How far back a candidate order or trade may lie.
    pub window: Duration,
    /// Tolerated difference between local and exchange clocks.
    pub clock_skew: Duration,
    /// Policy for the look-up calls.
    pub lookup_policy: RetryPolicy,
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self {
            recheck_delay: Duration::from_secs(1),
            window: Duration::from_secs(180),
            clock_skew: Duration::from_secs(30),
            lookup_policy: RetryPolicy::lookup(),
        }
    }
}

/// The order a placement attempted, after rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementIntent {
    /// Order side.
    pub side: OrderSide,
    /// Rounded amount.
    pub amount: Decimal,
    /// Rounded limit price.
    pub price: Decimal,
    /// Local time the first placement attempt was issued.
    pub issued_at: DateTime<Utc>,
}

/// Where a matching order was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Evidence {
    OpenOrder,
    TradeHistory,
}

impl Evidence {
    const fn as_str(self) -> &'static str {
        match self {
            Self::OpenOrder => "open_order",
            Self::TradeHistory => "trade_history",
        }
    }
}

/// Resolves an ambiguous placement against the exchange's own records.
///
/// Borrowed per call; holds no state between placements.
pub struct PlacementReconciler<'a, C: ?Sized> {
    client: &'a C,
    pair: &'a Pair,
    market: &'a MarketDescriptor,
    classifier: &'a OutcomeClassifier,
    settings: &'a ReconciliationSettings,
}

impl<'a, C: ExchangeClient + ?Sized> PlacementReconciler<'a, C> {
    /// Create a reconciler over one client and pair.
    #[must_use]
    pub const fn new(
        client: &'a C,
        pair: &'a Pair,
        market: &'a MarketDescriptor,
        classifier: &'a OutcomeClassifier,
        settings: &'a ReconciliationSettings,
    ) -> Self {
        Self {
            client,
            pair,
            market,
            classifier,
            settings,
        }
    }

    /// Look for the order an ambiguous placement may have created.
    ///
    /// Never places an order.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::PlacementUnconfirmed`] carrying the original
    /// ambiguous reason when no match is found or the look-ups fail.
    pub async fn reconcile(
        &self,
        intent: &PlacementIntent,
        ambiguous_reason: String,
    ) -> Result<OrderId, ExchangeError> {
        let started = tokio::time::Instant::now();
        let recheck_delay_ms =
            u64::try_from(self.settings.recheck_delay.as_millis()).unwrap_or(u64::MAX);

        tracing::warn!(
            pair = %self.pair,
            side = %intent.side,
            amount = %intent.amount,
            price = %intent.price,
            reason = %ambiguous_reason,
            recheck_delay_ms,
            "Ambiguous placement, reconciling against exchange records"
        );

        tokio::time::sleep(self.settings.recheck_delay).await;

        let verdict = self.find_match(intent).await;
        let elapsed = started.elapsed().as_secs_f64();

        match verdict {
            Ok(Some((id, evidence))) => {
                tracing::info!(
                    pair = %self.pair,
                    order_id = %id,
                    evidence = evidence.as_str(),
                    "Ambiguous placement reconciled"
                );
                metrics::record_placement_reconciliation(evidence.as_str(), elapsed);
                Ok(id)
            }
            Ok(None) => {
                tracing::warn!(
                    pair = %self.pair,
                    reason = %ambiguous_reason,
                    "No matching order found for ambiguous placement"
                );
                metrics::record_placement_reconciliation("not_found", elapsed);
                Err(ExchangeError::PlacementUnconfirmed {
                    reason: ambiguous_reason,
                })
            }
            Err(lookup_error) => {
                tracing::error!(
                    pair = %self.pair,
                    reason = %ambiguous_reason,
                    error = %lookup_error,
                    "Placement look-up failed, order status unknown"
                );
                metrics::record_placement_reconciliation("lookup_failed", elapsed);
                Err(ExchangeError::PlacementUnconfirmed {
                    reason: format!("{ambiguous_reason}; look-up failed: {lookup_error}"),
                })
            }
        }
    }

    async fn find_match(
        &self,
        intent: &PlacementIntent,
    ) -> Result<Option<(OrderId, Evidence)>, ExchangeError> {
        let cutoff = self.cutoff(intent);
        let scheduler = RetryScheduler::new(self.settings.lookup_policy.clone());

        let open_orders = scheduler
            .run(OperationKind::RecentOrders, || async {
                self.classifier.classify(
                    OperationKind::RecentOrders,
                    self.client.fetch_open_orders(self.pair).await,
                )
            })
            .await?
            .into_data(OperationKind::RecentOrders)?;

        if let Some(order) = self.match_open_order(intent, cutoff, &open_orders) {
            return Ok(Some((order.id.clone(), Evidence::OpenOrder)));
        }

        let trades = scheduler
            .run(OperationKind::TradeHistory, || async {
                self.classifier.classify(
                    OperationKind::TradeHistory,
                    self.client.fetch_trade_history(self.pair, Some(cutoff)).await,
                )
            })
            .await?
            .into_data(OperationKind::TradeHistory)?;

        Ok(Self::match_trade(intent, cutoff, &trades)
            .and_then(|trade| trade.order_id.clone())
            .map(|id| (id, Evidence::TradeHistory)))
    }

    /// Earliest creation time a candidate may carry.
    fn cutoff(&self, intent: &PlacementIntent) -> DateTime<Utc> {
        let window = TimeDelta::from_std(self.settings.window).unwrap_or(TimeDelta::MAX);
        let skew =
            TimeDelta::from_std(self.settings.clock_skew).unwrap_or_else(|_| TimeDelta::zero());
        let window_start = Utc::now()
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let earliest = window_start.max(intent.issued_at);
        earliest.checked_sub_signed(skew).unwrap_or(earliest)
    }

    fn match_open_order<'o>(
        &self,
        intent: &PlacementIntent,
        cutoff: DateTime<Utc>,
        open_orders: &'o [OpenOrder],
    ) -> Option<&'o OpenOrder> {
        open_orders
            .iter()
            .filter(|order| order.side == intent.side)
            .filter(|order| self.market.round_amount(order.starting_amount) == intent.amount)
            .filter(|order| self.market.round_price(order.price) == intent.price)
            // Undated orders cannot be placed inside the window
            .filter(|order| order.created_at.is_some_and(|created| created >= cutoff))
            .max_by_key(|order| order.created_at)
    }

    fn match_trade<'t>(
        intent: &PlacementIntent,
        cutoff: DateTime<Utc>,
        trades: &'t [TradeRecord],
    ) -> Option<&'t TradeRecord> {
        trades
            .iter()
            .filter(|trade| trade.order_id.is_some())
            .filter(|trade| trade.side == intent.side)
            .filter(|trade| trade.timestamp >= cutoff)
            .filter(|trade| trade.amount <= intent.amount)
            // A limit order only executes at its price or better
            .filter(|trade| match intent.side {
                OrderSide::Buy => trade.rate <= intent.price,
                OrderSide::Sell => trade.rate >= intent.price,
            })
            .max_by_key(|trade| trade.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockExchangeClient;
    use crate::resilience::RawError;
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;

    fn market() -> MarketDescriptor {
        MarketDescriptor::new(dec!(0.001), dec!(0.0001), dec!(0.01)).unwrap()
    }

    fn settings() -> ReconciliationSettings {
        ReconciliationSettings {
            lookup_policy: RetryPolicy::lookup().with_jitter(0.0),
            ..ReconciliationSettings::default()
        }
    }

    fn fixtures() -> (Pair, MarketDescriptor, OutcomeClassifier, ReconciliationSettings) {
        (
            Pair::new("USDT", "BTC"),
            market(),
            OutcomeClassifier::default(),
            settings(),
        )
    }

    fn intent() -> PlacementIntent {
        PlacementIntent {
            side: OrderSide::Buy,
            amount: dec!(0.5),
            price: dec!(100.25),
            issued_at: Utc::now(),
        }
    }

    fn open_order(id: &str, side: OrderSide, amount: Decimal, price: Decimal) -> OpenOrder {
        OpenOrder {
            id: OrderId::new(id),
            side,
            price,
            starting_amount: amount,
            remaining_amount: amount,
            created_at: Some(Utc::now()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn matches_open_order() {
        let mut client = MockExchangeClient::new();
        client.expect_fetch_open_orders().times(1).returning(|_| {
            Ok(vec![
                open_order("other-side", OrderSide::Sell, dec!(0.5), dec!(100.25)),
                open_order("other-price", OrderSide::Buy, dec!(0.5), dec!(101)),
                open_order("mine", OrderSide::Buy, dec!(0.50004), dec!(100.259)),
            ])
        });
        client.expect_fetch_trade_history().never();
        client.expect_place_order().never();

        let (pair, market, classifier, settings) = fixtures();
        let reconciler = PlacementReconciler::new(&client, &pair, &market, &classifier, &settings);

        let id = reconciler
            .reconcile(&intent(), "ESOCKETTIMEDOUT".to_string())
            .await
            .unwrap();
        assert_eq!(id, OrderId::new("mine"));
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_trade_history() {
        let mut client = MockExchangeClient::new();
        client.expect_fetch_open_orders().times(1).returning(|_| Ok(vec![]));
        client
            .expect_fetch_trade_history()
            .times(1)
            .withf(|_, since| since.is_some())
            .returning(|_, _| {
                let now = Utc::now();
                Ok(vec![
                    TradeRecord {
                        order_id: Some(OrderId::new("old")),
                        side: OrderSide::Buy,
                        amount: dec!(0.5),
                        rate: dec!(100),
                        timestamp: now - ChronoDuration::hours(2),
                    },
                    TradeRecord {
                        order_id: None,
                        side: OrderSide::Buy,
                        amount: dec!(0.5),
                        rate: dec!(100),
                        timestamp: now,
                    },
                    TradeRecord {
                        order_id: Some(OrderId::new("filled")),
                        side: OrderSide::Buy,
                        amount: dec!(0.5),
                        rate: dec!(100.2),
                        timestamp: now,
                    },
                ])
            });
        client.expect_place_order().never();

        let (pair, market, classifier, settings) = fixtures();
        let reconciler = PlacementReconciler::new(&client, &pair, &market, &classifier, &settings);

        let id = reconciler
            .reconcile(&intent(), "socket hang up".to_string())
            .await
            .unwrap();
        assert_eq!(id, OrderId::new("filled"));
    }

    #[tokio::test(start_paused = true)]
    async fn no_match_surfaces_ambiguous_error() {
        let mut client = MockExchangeClient::new();
        client.expect_fetch_open_orders().returning(|_| {
            let mut stale = open_order("stale", OrderSide::Buy, dec!(0.5), dec!(100.25));
            stale.created_at = Some(Utc::now() - ChronoDuration::hours(1));
            Ok(vec![stale])
        });
        client.expect_fetch_trade_history().returning(|_, _| Ok(vec![]));
        client.expect_place_order().never();

        let (pair, market, classifier, settings) = fixtures();
        let reconciler = PlacementReconciler::new(&client, &pair, &market, &classifier, &settings);

        let result = reconciler
            .reconcile(&intent(), "ESOCKETTIMEDOUT".to_string())
            .await;
        assert_eq!(
            result,
            Err(ExchangeError::PlacementUnconfirmed {
                reason: "ESOCKETTIMEDOUT".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn undated_open_order_is_not_evidence() {
        let mut client = MockExchangeClient::new();
        client.expect_fetch_open_orders().times(1).returning(|_| {
            let mut resting = open_order("resting", OrderSide::Buy, dec!(0.5), dec!(100.25));
            resting.created_at = None;
            Ok(vec![resting])
        });
        client
            .expect_fetch_trade_history()
            .times(1)
            .returning(|_, _| Ok(vec![]));
        client.expect_place_order().never();

        let (pair, market, classifier, settings) = fixtures();
        let reconciler = PlacementReconciler::new(&client, &pair, &market, &classifier, &settings);

        let err = reconciler
            .reconcile(&intent(), "ESOCKETTIMEDOUT".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::PlacementUnconfirmed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_failure_is_not_absence() {
        let mut client = MockExchangeClient::new();
        client
            .expect_fetch_open_orders()
            .times(5)
            .returning(|_| Err(RawError::message("ECONNRESET")));
        client.expect_fetch_trade_history().never();
        client.expect_place_order().never();

        let (pair, market, classifier, settings) = fixtures();
        let reconciler = PlacementReconciler::new(&client, &pair, &market, &classifier, &settings);

        let err = reconciler
            .reconcile(&intent(), "ESOCKETTIMEDOUT".to_string())
            .await
            .unwrap_err();
        let ExchangeError::PlacementUnconfirmed { reason } = err else {
            panic!("expected PlacementUnconfirmed, got {err:?}");
        };
        assert!(reason.starts_with("ESOCKETTIMEDOUT; look-up failed"));
        assert!(reason.contains("recent_orders failed after 5 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_recheck_delay_before_lookup() {
        let started = tokio::time::Instant::now();
        let mut client = MockExchangeClient::new();
        client.expect_fetch_open_orders().times(1).returning(move |_| {
            assert!(started.elapsed() >= Duration::from_secs(1));
            Ok(vec![open_order("mine", OrderSide::Buy, dec!(0.5), dec!(100.25))])
        });

        let (pair, market, classifier, settings) = fixtures();
        let reconciler = PlacementReconciler::new(&client, &pair, &market, &classifier, &settings);

        let result = reconciler
            .reconcile(&intent(), "ESOCKETTIMEDOUT".to_string())
            .await;
        assert!(result.is_ok());
    }
}
