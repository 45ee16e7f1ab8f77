//! Retry policies and the scheduler that drives an operation through them.
//!
//! # Classification
//!
//! | Outcome | Scheduler action |
//! |---------|------------------|
//! | `Success` | return immediately |
//! | `FatalError` | return immediately, never retried |
//! | `RetryableError` | back off, retry until the attempt/time budget is spent |
//! | `AmbiguousResult` | hand to the resolver (placement reconciliation) |
//!
//! # Example
//!
//! ```rust,ignore
//! use exchange_gateway::resilience::{RetryPolicy, RetryScheduler, OperationKind};
//!
//! let scheduler = RetryScheduler::new(RetryPolicy::best_effort());
//! let ticker = scheduler
//!     .run(OperationKind::Ticker, || async {
//!         classifier.classify(OperationKind::Ticker, client.fetch_ticker(&pair).await)
//!     })
//!     .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::outcome::{OperationKind, Outcome, Payload};
use crate::error::ExchangeError;
use crate::observability::metrics;

/// Immutable retry configuration for one kind of operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of calls, `None` for unlimited.
    pub max_attempts: Option<u32>,
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub backoff_factor: f64,
    /// Jitter factor for randomization (0.1 = ±10%).
    pub jitter_factor: f64,
    /// Total time budget across all attempts, `None` for no limit.
    pub max_elapsed: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::best_effort()
    }
}

impl RetryPolicy {
    /// Policy for order placement and cancellation: many attempts, slow growth.
    #[must_use]
    pub const fn critical() -> Self {
        Self {
            max_attempts: Some(10),
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 1.2,
            jitter_factor: 0.1,
            max_elapsed: None,
        }
    }

    /// Policy for read-only calls whose caller can try again later.
    #[must_use]
    pub const fn best_effort() -> Self {
        Self {
            max_attempts: Some(5),
            min_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_factor: 1.5,
            jitter_factor: 0.1,
            max_elapsed: None,
        }
    }

    /// Unlimited policy for status polling. Never used for placement.
    #[must_use]
    pub const fn forever() -> Self {
        Self {
            max_attempts: None,
            min_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(30),
            backoff_factor: 1.2,
            jitter_factor: 0.1,
            max_elapsed: None,
        }
    }

    /// Bounded policy for the look-ups run by placement reconciliation.
    #[must_use]
    pub const fn lookup() -> Self {
        Self {
            max_attempts: Some(5),
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_factor: 1.5,
            jitter_factor: 0.1,
            max_elapsed: None,
        }
    }

    /// Override the attempt limit.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Override the elapsed-time budget.
    #[must_use]
    pub const fn with_max_elapsed(mut self, max_elapsed: Option<Duration>) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    /// Override the jitter factor.
    #[must_use]
    pub const fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor;
        self
    }

    /// Whether the policy can retry forever.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.max_attempts.is_none() && self.max_elapsed.is_none()
    }
}

/// Calculator for exponential backoff with jitter.
#[derive(Debug)]
pub struct ExponentialBackoffCalculator {
    current_retry: u32,
    max_retries: Option<u32>,
    min_delay_ms: u64,
    max_delay_ms: u64,
    backoff_factor: f64,
    jitter_factor: f64,
}

impl ExponentialBackoffCalculator {
    /// Create a new backoff calculator from a retry policy.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(policy: &RetryPolicy) -> Self {
        let max_retries = match policy.max_attempts {
            Some(attempts) => Some(attempts.saturating_sub(1)),
            None => None,
        };
        Self {
            current_retry: 0,
            max_retries,
            min_delay_ms: policy.min_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            backoff_factor: policy.backoff_factor,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Delay before the next retry, `None` once the attempt limit is reached.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if !self.has_remaining_attempts() {
            return None;
        }

        let base_ms = self.calculate_base_backoff_ms();
        let capped_ms = self.apply_jitter(base_ms).min(self.max_delay_ms);

        self.current_retry = self.current_retry.saturating_add(1);

        Some(Duration::from_millis(capped_ms))
    }

    fn calculate_base_backoff_ms(&self) -> u64 {
        let exponent = i32::try_from(self.current_retry).unwrap_or(i32::MAX);
        let multiplier = self.backoff_factor.powi(exponent);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let backoff = (self.min_delay_ms as f64 * multiplier).min(self.max_delay_ms as f64) as u64;
        backoff
    }

    /// Random value in [backoff * (1 - jitter), backoff * (1 + jitter)].
    #[allow(clippy::cast_precision_loss)]
    fn apply_jitter(&self, backoff_ms: u64) -> u64 {
        if self.jitter_factor <= 0.0 || backoff_ms == 0 {
            return backoff_ms;
        }
        let jitter_range = backoff_ms as f64 * self.jitter_factor;
        let min = (backoff_ms as f64 - jitter_range).max(0.0);
        let max = backoff_ms as f64 + jitter_range;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let jittered = rand::rng().random_range(min..=max) as u64;
        jittered
    }

    /// Number of retries handed out so far.
    #[must_use]
    pub const fn current_retry(&self) -> u32 {
        self.current_retry
    }

    /// Check if more retries are available.
    #[must_use]
    pub const fn has_remaining_attempts(&self) -> bool {
        match self.max_retries {
            Some(max) => self.current_retry < max,
            None => true,
        }
    }
}

/// How an attempt loop ended before any resolver ran.
enum Settled<T> {
    Done(Payload<T>),
    Ambiguous(String),
}

/// Drives one logical operation through its retry policy.
///
/// Holds no per-call state, so one scheduler can serve concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct RetryScheduler {
    policy: RetryPolicy,
}

impl RetryScheduler {
    /// Create a scheduler for a policy.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy in force.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `attempt` until it succeeds, fails fatally or the budget is spent.
    ///
    /// An ambiguous outcome is not retried; it surfaces as
    /// [`ExchangeError::PlacementUnconfirmed`].
    ///
    /// # Errors
    ///
    /// Returns the fatal error, [`ExchangeError::RetriesExhausted`] with the
    /// last reason, or [`ExchangeError::PlacementUnconfirmed`].
    pub async fn run<T, F, Fut>(
        &self,
        operation: OperationKind,
        attempt: F,
    ) -> Result<Payload<T>, ExchangeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        match self.settle(operation, attempt).await? {
            Settled::Done(payload) => Ok(payload),
            Settled::Ambiguous(reason) => Err(ExchangeError::PlacementUnconfirmed { reason }),
        }
    }

    /// Like [`run`](Self::run), but an ambiguous outcome is handed to
    /// `resolve`, which decides between reconciled success and failure.
    ///
    /// # Errors
    ///
    /// Returns the fatal error, [`ExchangeError::RetriesExhausted`], or
    /// whatever `resolve` returns.
    pub async fn run_resolving<T, F, Fut, R, RFut>(
        &self,
        operation: OperationKind,
        attempt: F,
        resolve: R,
    ) -> Result<Payload<T>, ExchangeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T>>,
        R: FnOnce(String) -> RFut,
        RFut: Future<Output = Result<Payload<T>, ExchangeError>>,
    {
        match self.settle(operation, attempt).await? {
            Settled::Done(payload) => Ok(payload),
            Settled::Ambiguous(reason) => resolve(reason).await,
        }
    }

    async fn settle<T, F, Fut>(
        &self,
        operation: OperationKind,
        mut attempt: F,
    ) -> Result<Settled<T>, ExchangeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        let started = Instant::now();
        let mut backoff = ExponentialBackoffCalculator::new(&self.policy);
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            let outcome = attempt().await;
            metrics::record_attempt(operation, outcome.label());

            let reason = match outcome {
                Outcome::Success(payload) => return Ok(Settled::Done(payload)),
                Outcome::FatalError(fatal) => {
                    let error = fatal.into_error(operation);
                    tracing::error!(
                        operation = %operation,
                        attempt = attempts,
                        error = %error,
                        "Fatal exchange error"
                    );
                    return Err(error);
                }
                Outcome::AmbiguousResult(reason) => {
                    tracing::warn!(
                        operation = %operation,
                        attempt = attempts,
                        error = %reason,
                        "Ambiguous exchange result, not retrying"
                    );
                    return Ok(Settled::Ambiguous(reason));
                }
                Outcome::RetryableError(reason) => reason,
            };

            let delay = backoff
                .next_backoff()
                .filter(|delay| self.within_budget(started, *delay));

            let Some(delay) = delay else {
                tracing::error!(
                    operation = %operation,
                    attempts,
                    last_error = %reason,
                    "Retries exhausted"
                );
                metrics::record_retries_exhausted(operation);
                return Err(ExchangeError::RetriesExhausted {
                    operation,
                    attempts,
                    last_error: reason,
                });
            };

            tracing::warn!(
                operation = %operation,
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %reason,
                "Retryable exchange error, retrying"
            );
            metrics::record_retry(operation);

            tokio::time::sleep(delay).await;
        }
    }

    fn within_budget(&self, started: Instant, delay: Duration) -> bool {
        self.policy
            .max_elapsed
            .is_none_or(|budget| started.elapsed() + delay <= budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::outcome::FatalReason;

    fn no_jitter(policy: RetryPolicy) -> RetryPolicy {
        policy.with_jitter(0.0)
    }

    #[test]
    fn test_presets() {
        let critical = RetryPolicy::critical();
        assert_eq!(critical.max_attempts, Some(10));
        assert_eq!(critical.min_delay, Duration::from_secs(1));
        assert_eq!(critical.max_delay, Duration::from_secs(30));
        assert!((critical.backoff_factor - 1.2).abs() < f64::EPSILON);

        let best_effort = RetryPolicy::best_effort();
        assert_eq!(best_effort.max_attempts, Some(5));
        assert!((best_effort.backoff_factor - 1.5).abs() < f64::EPSILON);

        assert!(RetryPolicy::forever().is_unlimited());
        assert!(!RetryPolicy::lookup().is_unlimited());
        assert_eq!(RetryPolicy::default(), RetryPolicy::best_effort());
    }

    #[test]
    fn test_backoff_sequence() {
        let policy = RetryPolicy {
            max_attempts: Some(5),
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter_factor: 0.0,
            max_elapsed: None,
        };
        let mut backoff = ExponentialBackoffCalculator::new(&policy);

        // Five calls leave room for four retries: 100ms, 200ms, 400ms, 800ms
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(400)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(800)));
        assert!(backoff.next_backoff().is_none());
        assert_eq!(backoff.current_retry(), 4);
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = RetryPolicy {
            max_attempts: None,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_factor: 10.0,
            jitter_factor: 0.0,
            max_elapsed: None,
        };
        let mut backoff = ExponentialBackoffCalculator::new(&policy);

        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
        for _ in 0..100 {
            assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
        }
        assert!(backoff.has_remaining_attempts());
    }

    #[test]
    fn test_jitter_range() {
        let policy = RetryPolicy::best_effort().with_jitter(0.2);

        for _ in 0..100 {
            let mut backoff = ExponentialBackoffCalculator::new(&policy);
            let delay = backoff.next_backoff().expect("first backoff");

            // Base is 250ms, jitter is ±20%
            assert!(
                delay >= Duration::from_millis(200) && delay <= Duration::from_millis(300),
                "Delay {delay:?} not in expected range 200-300ms"
            );
        }
    }

    #[test]
    fn test_single_attempt_policy_never_backs_off() {
        let mut backoff =
            ExponentialBackoffCalculator::new(&RetryPolicy::critical().with_max_attempts(Some(1)));
        assert!(backoff.next_backoff().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_n_retryable_then_success_makes_n_plus_one_calls() {
        let scheduler = RetryScheduler::new(no_jitter(RetryPolicy::critical()));
        let mut calls = 0u32;

        let result = scheduler
            .run(OperationKind::Ticker, || {
                calls += 1;
                let n = calls;
                async move {
                    if n <= 3 {
                        Outcome::RetryableError("ECONNRESET".to_string())
                    } else {
                        Outcome::Success(Payload::Data(n))
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(Payload::Data(4)));
        assert_eq!(calls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_after_cap_calls() {
        let scheduler = RetryScheduler::new(no_jitter(RetryPolicy::critical()));
        let mut calls = 0u32;

        let result: Result<Payload<()>, _> = scheduler
            .run(OperationKind::CancelOrder, || {
                calls += 1;
                let n = calls;
                async move { Outcome::RetryableError(format!("ETIMEDOUT #{n}")) }
            })
            .await;

        assert_eq!(calls, 10);
        assert_eq!(
            result,
            Err(ExchangeError::RetriesExhausted {
                operation: OperationKind::CancelOrder,
                attempts: 10,
                last_error: "ETIMEDOUT #10".to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_stops_immediately() {
        let scheduler = RetryScheduler::new(RetryPolicy::critical());
        let mut calls = 0u32;

        let result: Result<Payload<()>, _> = scheduler
            .run(OperationKind::PlaceOrder, || {
                calls += 1;
                async {
                    Outcome::FatalError(FatalReason::Rejected("Insufficient funds".to_string()))
                }
            })
            .await;

        assert_eq!(calls, 1);
        assert!(matches!(result, Err(ExchangeError::Rejected { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_grow_and_suspend_only_the_operation() {
        let policy = RetryPolicy {
            max_attempts: Some(4),
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter_factor: 0.0,
            max_elapsed: None,
        };
        let scheduler = RetryScheduler::new(policy);
        let started = Instant::now();

        let result: Result<Payload<()>, _> = scheduler
            .run(OperationKind::Balances, || async {
                Outcome::RetryableError("503".to_string())
            })
            .await;

        assert!(result.is_err());
        // 1s + 2s + 4s between four calls
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_secs(7) && elapsed < Duration::from_millis(7_050),
            "elapsed {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_budget_bounds_unlimited_attempts() {
        let policy = no_jitter(RetryPolicy::forever())
            .with_max_elapsed(Some(Duration::from_secs(60)));
        let scheduler = RetryScheduler::new(policy);
        let mut calls = 0u32;

        let result: Result<Payload<()>, _> = scheduler
            .run(OperationKind::CheckOrder, || {
                calls += 1;
                async { Outcome::RetryableError("Bad Gateway".to_string()) }
            })
            .await;

        // 10s, 12s, 14.4s, 17.28s fit in 60s; the next 20.736s does not
        assert_eq!(calls, 5);
        assert!(matches!(
            result,
            Err(ExchangeError::RetriesExhausted { attempts: 5, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_policy_keeps_going() {
        let scheduler = RetryScheduler::new(no_jitter(RetryPolicy::forever()));
        let mut calls = 0u32;

        let result = scheduler
            .run(OperationKind::CheckOrder, || {
                calls += 1;
                let n = calls;
                async move {
                    if n < 50 {
                        Outcome::RetryableError("ECONNRESET".to_string())
                    } else {
                        Outcome::Success(Payload::Data("open"))
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(Payload::Data("open")));
        assert_eq!(calls, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ambiguous_without_resolver_is_unconfirmed() {
        let scheduler = RetryScheduler::new(RetryPolicy::critical());
        let mut calls = 0u32;

        let result: Result<Payload<()>, _> = scheduler
            .run(OperationKind::PlaceOrder, || {
                calls += 1;
                async { Outcome::AmbiguousResult("ESOCKETTIMEDOUT".to_string()) }
            })
            .await;

        assert_eq!(calls, 1);
        assert_eq!(
            result,
            Err(ExchangeError::PlacementUnconfirmed {
                reason: "ESOCKETTIMEDOUT".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ambiguous_is_handed_to_resolver() {
        let scheduler = RetryScheduler::new(RetryPolicy::critical());
        let mut calls = 0u32;

        let result = scheduler
            .run_resolving(
                OperationKind::PlaceOrder,
                || {
                    calls += 1;
                    async { Outcome::AmbiguousResult("socket hang up".to_string()) }
                },
                |reason| async move {
                    assert_eq!(reason, "socket hang up");
                    Ok(Payload::Data("order-1"))
                },
            )
            .await;

        assert_eq!(calls, 1);
        assert_eq!(result, Ok(Payload::Data("order-1")));
    }

    #[tokio::test]
    async fn test_markers_are_successes() {
        let scheduler = RetryScheduler::default();
        let result: Result<Payload<()>, _> = scheduler
            .run(OperationKind::CancelOrder, || async {
                Outcome::Success(Payload::AlreadyFilled)
            })
            .await;
        assert_eq!(result, Ok(Payload::AlreadyFilled));
    }
}
