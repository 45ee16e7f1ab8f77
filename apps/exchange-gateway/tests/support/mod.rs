//! Scripted exchange for integration tests.
//!
//! Each capability replays a queue of scripted results, then falls back to a
//! fixed result. Calls are counted per capability.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exchange_gateway::{
    ExchangeAdapter, ExchangeClient, Fill, MarketDescriptor, OpenOrder, OrderId, OrderSide, Pair,
    RawError, Ticker, TradeRecord,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Replayable results for one capability.
pub struct Script<T> {
    queue: Mutex<VecDeque<Result<T, RawError>>>,
    fallback: Mutex<Option<Result<T, RawError>>>,
    calls: AtomicU32,
}

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    /// Queue one result.
    pub fn push(&self, result: Result<T, RawError>) -> &Self {
        self.queue.lock().unwrap().push_back(result);
        self
    }

    /// Queue the same result `n` times.
    pub fn push_n(&self, n: usize, result: &Result<T, RawError>) -> &Self {
        let mut queue = self.queue.lock().unwrap();
        for _ in 0..n {
            queue.push_back(result.clone());
        }
        drop(queue);
        self
    }

    /// Result returned once the queue is empty.
    pub fn always(&self, result: Result<T, RawError>) -> &Self {
        *self.fallback.lock().unwrap() = Some(result);
        self
    }

    /// Number of calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self, capability: &str) -> Result<T, RawError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.queue.lock().unwrap().pop_front() {
            return result;
        }
        self.fallback
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| panic!("unscripted call to {capability}"))
    }
}

/// Hand-written exchange whose every answer is scripted by the test.
pub struct ScriptedExchange {
    pub ticker: Script<Ticker>,
    pub balances: Script<HashMap<String, Decimal>>,
    pub place: Script<OrderId>,
    pub open_orders: Script<Vec<OpenOrder>>,
    pub order_trades: Script<Vec<Fill>>,
    pub cancel: Script<()>,
    pub trade_history: Script<Vec<TradeRecord>>,
    placed: Mutex<Vec<(OrderSide, Decimal, Decimal)>>,
}

impl ScriptedExchange {
    pub fn new() -> Self {
        Self {
            ticker: Script::new(),
            balances: Script::new(),
            place: Script::new(),
            open_orders: Script::new(),
            order_trades: Script::new(),
            cancel: Script::new(),
            trade_history: Script::new(),
            placed: Mutex::new(Vec::new()),
        }
    }

    /// Every placement request received, in order.
    pub fn placed(&self) -> Vec<(OrderSide, Decimal, Decimal)> {
        self.placed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeClient for ScriptedExchange {
    async fn fetch_ticker(&self, _pair: &Pair) -> Result<Ticker, RawError> {
        self.ticker.next("fetch_ticker")
    }

    async fn fetch_balances(&self, _pair: &Pair) -> Result<HashMap<String, Decimal>, RawError> {
        self.balances.next("fetch_balances")
    }

    async fn place_order(
        &self,
        _pair: &Pair,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    ) -> Result<OrderId, RawError> {
        self.placed.lock().unwrap().push((side, amount, price));
        self.place.next("place_order")
    }

    async fn fetch_open_orders(&self, _pair: &Pair) -> Result<Vec<OpenOrder>, RawError> {
        self.open_orders.next("fetch_open_orders")
    }

    async fn fetch_order_trades(
        &self,
        _pair: &Pair,
        _id: &OrderId,
    ) -> Result<Vec<Fill>, RawError> {
        self.order_trades.next("fetch_order_trades")
    }

    async fn cancel_order(&self, _pair: &Pair, _id: &OrderId) -> Result<(), RawError> {
        self.cancel.next("cancel_order")
    }

    async fn fetch_trade_history(
        &self,
        _pair: &Pair,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<TradeRecord>, RawError> {
        self.trade_history.next("fetch_trade_history")
    }
}

/// BTC quoted in USDT: min 0.001, amount tick 0.0001, price tick 0.01.
pub fn btc_market() -> MarketDescriptor {
    MarketDescriptor::new(dec!(0.001), dec!(0.0001), dec!(0.01)).unwrap()
}

/// Adapter over a fresh scripted exchange.
pub fn adapter() -> ExchangeAdapter<ScriptedExchange> {
    ExchangeAdapter::new(ScriptedExchange::new(), Pair::new("USDT", "BTC"), btc_market())
        .with_fee(dec!(0.002))
}

/// An open order listed by the exchange.
pub fn open_order(
    id: &str,
    side: OrderSide,
    amount: Decimal,
    remaining: Decimal,
    price: Decimal,
) -> OpenOrder {
    OpenOrder {
        id: OrderId::new(id),
        side,
        price,
        starting_amount: amount,
        remaining_amount: remaining,
        created_at: Some(Utc::now()),
    }
}
