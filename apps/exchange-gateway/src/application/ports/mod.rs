//! Application Ports
//!
//! Interfaces to the outside world that the application layer depends on.

mod exchange_client;

#[cfg(test)]
pub use exchange_client::MockExchangeClient;
pub use exchange_client::{ExchangeClient, OpenOrder, TradeRecord};
