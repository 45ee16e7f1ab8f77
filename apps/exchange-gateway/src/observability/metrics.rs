//! Metrics for exchange calls, retries and reconciliation.
//!
//! Recorded through the `metrics` facade. The library installs no exporter;
//! without a recorder every call is a no-op.
//!
//! # Example
//!
//! ```ignore
//! use exchange_gateway::observability::record_attempt;
//! use exchange_gateway::resilience::OperationKind;
//!
//! record_attempt(OperationKind::PlaceOrder, "ambiguous");
//! ```

use metrics::{counter, histogram};

use crate::resilience::OperationKind;

// ============================================================================
// Call Metrics
// ============================================================================

/// Record one classified exchange call.
///
/// # Arguments
///
/// * `operation` - Operation kind
/// * `outcome` - Outcome label (`"success"`, `"fatal"`, `"retryable"`, `"ambiguous"`)
pub fn record_attempt(operation: OperationKind, outcome: &'static str) {
    counter!(
        "exchange_call_attempts_total",
        "operation" => operation.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a scheduled retry.
pub fn record_retry(operation: OperationKind) {
    counter!("exchange_call_retries_total", "operation" => operation.as_str()).increment(1);
}

/// Record a spent retry budget.
pub fn record_retries_exhausted(operation: OperationKind) {
    counter!(
        "exchange_call_retries_exhausted_total",
        "operation" => operation.as_str()
    )
    .increment(1);
}

// ============================================================================
// Order Metrics
// ============================================================================

/// Record an order refused before any remote call.
///
/// # Arguments
///
/// * `reason` - Short reason (e.g. `"below_minimum"`, `"zero_price"`)
pub fn record_local_rejection(reason: &'static str) {
    counter!("order_local_rejections_total", "reason" => reason).increment(1);
}

/// Record the verdict of a placement reconciliation.
///
/// # Arguments
///
/// * `verdict` - `"open_order"`, `"trade_history"`, `"not_found"` or `"lookup_failed"`
/// * `duration_seconds` - Time spent reconciling, including the recheck delay
pub fn record_placement_reconciliation(verdict: &'static str, duration_seconds: f64) {
    counter!("placement_reconciliations_total", "verdict" => verdict).increment(1);
    histogram!("placement_reconciliation_seconds").record(duration_seconds);
}

/// Record a cancel result.
///
/// `filled` is true when the cancel lost the race against execution.
pub fn record_cancel(filled: bool) {
    let result = if filled { "already_filled" } else { "cancelled" };
    counter!("order_cancels_total", "result" => result).increment(1);
}
