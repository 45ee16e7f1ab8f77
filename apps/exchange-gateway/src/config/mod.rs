//! Configuration module for the exchange gateway.
//!
//! Loads a YAML file with environment variable interpolation and validates
//! it before any adapter is built. Credentials are not part of this file.
//!
//! # Usage
//!
//! ```rust,ignore
//! use exchange_gateway::config::load_config;
//!
//! // Load from default path (gateway.yaml)
//! let config = load_config(None)?;
//!
//! // Access configuration values
//! println!("pair: {}", config.market.pair());
//! ```

mod market;
mod observability;
mod reconciliation;
mod retry;
mod transport;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use market::MarketConfig;
pub use observability::{LOG_FORMATS, LoggingConfig, ObservabilityConfig};
pub use reconciliation::ReconciliationConfig;
pub use retry::{RetryConfig, RetryPolicyConfig};
pub use transport::TransportConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Traded pair, limits and fee.
    pub market: MarketConfig,
    /// Retry policies.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Placement reconciliation timing.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// HTTP transport settings.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "gateway.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("gateway.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is a compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str());
        match cap.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(v)) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let market = &config.market;
    if market.currency.trim().is_empty() || market.asset.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "market.currency and market.asset must not be empty".to_string(),
        ));
    }

    market
        .descriptor()
        .map_err(|e| ConfigError::ValidationError(format!("market: {e}")))?;

    if market.fee < rust_decimal::Decimal::ZERO || market.fee >= rust_decimal::Decimal::ONE {
        return Err(ConfigError::ValidationError(
            "market.fee must be in [0, 1)".to_string(),
        ));
    }

    let policies = [
        ("critical", config.retry.critical_policy()),
        ("best_effort", config.retry.best_effort_policy()),
        ("polling", config.retry.polling_policy()),
        ("lookup", config.retry.lookup_policy()),
    ];
    for (name, policy) in &policies {
        retry::validate_policy(name, policy).map_err(ConfigError::ValidationError)?;
    }

    // Placement must never retry forever
    if config.retry.critical_policy().is_unlimited() {
        return Err(ConfigError::ValidationError(
            "retry.critical must bound max_attempts or max_elapsed_ms".to_string(),
        ));
    }
    if config.retry.lookup_policy().is_unlimited() {
        return Err(ConfigError::ValidationError(
            "retry.lookup must bound max_attempts or max_elapsed_ms".to_string(),
        ));
    }

    if config.reconciliation.window_secs == 0 {
        return Err(ConfigError::ValidationError(
            "reconciliation.window_secs must be positive".to_string(),
        ));
    }

    if config.transport.timeout_ms == 0 || config.transport.connect_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "transport timeouts must be positive".to_string(),
        ));
    }

    let format = config.observability.logging.format.as_str();
    if !LOG_FORMATS.contains(&format) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {LOG_FORMATS:?}"
        )));
    }

    Ok(())
}
