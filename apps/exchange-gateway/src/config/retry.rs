//! Retry policy configuration.
//!
//! Each section overrides individual fields of a built-in preset; omitted
//! fields keep the preset's value.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::RetryPolicy;

/// Retry policies per operation class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Order placement and cancellation (preset: `critical`).
    #[serde(default)]
    pub critical: RetryPolicyConfig,
    /// Ticker and balances (preset: `best_effort`).
    #[serde(default)]
    pub best_effort: RetryPolicyConfig,
    /// Order status and fill look-ups (preset: `forever`).
    #[serde(default)]
    pub polling: RetryPolicyConfig,
    /// Placement reconciliation look-ups (preset: `lookup`).
    #[serde(default)]
    pub lookup: RetryPolicyConfig,
}

impl RetryConfig {
    /// Resolved placement/cancel policy.
    #[must_use]
    pub fn critical_policy(&self) -> RetryPolicy {
        self.critical.apply(RetryPolicy::critical())
    }

    /// Resolved read policy.
    #[must_use]
    pub fn best_effort_policy(&self) -> RetryPolicy {
        self.best_effort.apply(RetryPolicy::best_effort())
    }

    /// Resolved status polling policy.
    #[must_use]
    pub fn polling_policy(&self) -> RetryPolicy {
        self.polling.apply(RetryPolicy::forever())
    }

    /// Resolved reconciliation look-up policy.
    #[must_use]
    pub fn lookup_policy(&self) -> RetryPolicy {
        self.lookup.apply(RetryPolicy::lookup())
    }
}

/// Field overrides for one policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    /// Maximum number of calls; 0 means unlimited.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Delay before the first retry, in milliseconds.
    #[serde(default)]
    pub min_delay_ms: Option<u64>,
    /// Upper bound for a single delay, in milliseconds.
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
    /// Growth factor between delays.
    #[serde(default)]
    pub backoff_factor: Option<f64>,
    /// Jitter factor (0.1 = ±10%).
    #[serde(default)]
    pub jitter_factor: Option<f64>,
    /// Total time budget in milliseconds; 0 means none.
    #[serde(default)]
    pub max_elapsed_ms: Option<u64>,
}

impl RetryPolicyConfig {
    /// Apply the overrides to a preset.
    #[must_use]
    pub fn apply(&self, preset: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self
                .max_attempts
                .map_or(preset.max_attempts, |n| (n > 0).then_some(n)),
            min_delay: self
                .min_delay_ms
                .map_or(preset.min_delay, Duration::from_millis),
            max_delay: self
                .max_delay_ms
                .map_or(preset.max_delay, Duration::from_millis),
            backoff_factor: self.backoff_factor.unwrap_or(preset.backoff_factor),
            jitter_factor: self.jitter_factor.unwrap_or(preset.jitter_factor),
            max_elapsed: self.max_elapsed_ms.map_or(preset.max_elapsed, |ms| {
                (ms > 0).then(|| Duration::from_millis(ms))
            }),
        }
    }
}

/// Check a resolved policy, naming the section in the error.
pub(super) fn validate_policy(name: &str, policy: &RetryPolicy) -> Result<(), String> {
    if !policy.backoff_factor.is_finite() || policy.backoff_factor < 1.0 {
        return Err(format!("retry.{name}.backoff_factor must be a finite value of at least 1.0"));
    }
    if !policy.jitter_factor.is_finite() || !(0.0..=1.0).contains(&policy.jitter_factor) {
        return Err(format!("retry.{name}.jitter_factor must be between 0.0 and 1.0"));
    }
    if policy.min_delay > policy.max_delay {
        return Err(format!("retry.{name}.min_delay_ms must not exceed max_delay_ms"));
    }
    Ok(())
}
