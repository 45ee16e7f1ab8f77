//! Resilience layer: outcome classification and retry scheduling.
//!
//! Every exchange call is classified into an [`Outcome`] by the
//! [`OutcomeClassifier`] and driven by a [`RetryScheduler`] under a
//! [`RetryPolicy`]. Both live here once and are shared by every exchange
//! client implementation.

pub mod classifier;
pub mod outcome;
pub mod retry;

pub use classifier::{
    MESSAGE_SIGNATURES, OVERRIDE_SIGNATURES, OutcomeClassifier, OverrideMarker, RawError,
    STATUS_SIGNATURES, SignatureKind, classify, inspect_body,
};
pub use outcome::{FatalReason, OperationKind, Outcome, Payload};
pub use retry::{ExponentialBackoffCalculator, RetryPolicy, RetryScheduler};
