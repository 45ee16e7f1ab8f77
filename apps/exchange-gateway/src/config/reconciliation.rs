//! Placement reconciliation configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::reconciliation::ReconciliationSettings;
use crate::resilience::RetryPolicy;

/// Placement reconciliation timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Wait before looking the order up, in milliseconds.
    #[serde(default = "default_recheck_delay_ms")]
    pub recheck_delay_ms: u64,
    /// Recency window for candidate orders and trades, in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Tolerated clock difference with the exchange, in seconds.
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            recheck_delay_ms: default_recheck_delay_ms(),
            window_secs: default_window_secs(),
            clock_skew_secs: default_clock_skew_secs(),
        }
    }
}

impl ReconciliationConfig {
    /// Convert to the settings used by the placement reconciler.
    #[must_use]
    pub const fn to_settings(&self, lookup_policy: RetryPolicy) -> ReconciliationSettings {
        ReconciliationSettings {
            recheck_delay: Duration::from_millis(self.recheck_delay_ms),
            window: Duration::from_secs(self.window_secs),
            clock_skew: Duration::from_secs(self.clock_skew_secs),
            lookup_policy,
        }
    }
}

const fn default_recheck_delay_ms() -> u64 {
    1_000
}

const fn default_window_secs() -> u64 {
    180
}

const fn default_clock_skew_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reconciler_defaults() {
        let settings = ReconciliationConfig::default().to_settings(RetryPolicy::lookup());
        assert_eq!(settings, ReconciliationSettings::default());
    }
}
