//! Application Layer
//!
//! The strategy-facing adapter, the exchange client port it drives and the
//! reconcilers it routes results through.

pub mod adapter;
pub mod ports;
pub mod reconciliation;

pub use adapter::{AdapterPolicies, ExchangeAdapter};
