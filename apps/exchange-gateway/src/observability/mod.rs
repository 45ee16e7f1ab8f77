//! Observability module for metrics.
//!
//! Structured logging is set up in [`crate::telemetry`].

pub mod metrics;

pub use self::metrics::{
    record_attempt, record_cancel, record_local_rejection, record_placement_reconciliation,
    record_retries_exhausted, record_retry,
};
