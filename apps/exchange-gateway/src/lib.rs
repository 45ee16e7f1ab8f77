// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Exchange Gateway - Rust Core Library
//!
//! Resilience and normalization layer between an automated trading strategy
//! and a remote exchange's trading API. It carries a single logical intent
//! ("place this order", "is this order still open", "cancel this order")
//! through an unreliable service with at-most-one-duplicate and
//! eventually-consistent-status guarantees.
//!
//! # Architecture
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: pairs, market limits, orders, fills and their VWAP reduction
//! - **Resilience**: outcome classification and retry scheduling, shared by
//!   every exchange
//! - **Application**: the `ExchangeAdapter` facade, the `ExchangeClient` port
//!   and the placement / order state / cancel reconcilers
//! - **Infrastructure**: the HTTP transport exchange clients build on
//!
//! # Control flow
//!
//! ```text
//! strategy ─► ExchangeAdapter ─► RetryScheduler ─► ExchangeClient
//!                  ▲                   │
//!                  │             OutcomeClassifier
//!                  │                   │
//!                  └──── Reconcilers ◄─┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Layers
// =============================================================================

/// Domain layer - plain values the rest of the crate computes with.
pub mod domain;

/// Resilience layer - outcome classification and retry scheduling.
pub mod resilience;

/// Application layer - adapter facade, ports and reconcilers.
pub mod application;

/// Infrastructure layer - HTTP transport.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Error types returned by gateway operations.
pub mod error;

/// Metrics recording.
pub mod observability;

/// Tracing subscriber setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::ports::{ExchangeClient, OpenOrder, TradeRecord};
pub use application::reconciliation::{CancelOutcome, CheckOrderResult, ReconciliationSettings};
pub use application::{AdapterPolicies, ExchangeAdapter};
pub use domain::{
    Fill, FillSummary, Holding, MarketDescriptor, Order, OrderId, OrderSide, OrderState, Pair,
    Portfolio, Ticker,
};
pub use error::ExchangeError;
pub use resilience::{
    OperationKind, Outcome, OutcomeClassifier, Payload, RawError, RetryPolicy, RetryScheduler,
};
