//! Domain layer: pairs, market limits, orders and fills.
//!
//! No I/O lives here; every type is a plain value the resilience and
//! reconciliation layers compute with.

pub mod fill;
pub mod market;
pub mod order;
pub mod pair;
pub mod quote;

pub use fill::{Fill, FillSummary};
pub use market::MarketDescriptor;
pub use order::{Order, OrderSide, OrderState};
pub use pair::{OrderId, Pair};
pub use quote::{Holding, Portfolio, Ticker};
