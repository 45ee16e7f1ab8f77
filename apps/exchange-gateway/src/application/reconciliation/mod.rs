//! Reconciliation of placement, order status and cancellation against the
//! exchange's eventually consistent records.

mod cancel;
mod order_state;
mod placement;

pub use cancel::{CancelOutcome, CancelReconciler};
pub use order_state::{CheckOrderResult, OrderStateResolver};
pub use placement::{PlacementIntent, PlacementReconciler, ReconciliationSettings};
