//! HTTP transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP transport settings shared by exchange clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Exchange API base URL.
    #[serde(default)]
    pub base_url: String,
    /// Whole-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl TransportConfig {
    /// Whole-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

const fn default_timeout_ms() -> u64 {
    15_000
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    concat!("exchange-gateway/", env!("CARGO_PKG_VERSION")).to_string()
}
