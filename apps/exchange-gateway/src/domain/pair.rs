//! Trading pair identity and order identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange-assigned identifier of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Create a new identifier from a string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A `(currency, asset)` trading pair.
///
/// The currency is what the asset is priced in (e.g. `USDT` in `USDT/BTC`).
/// Symbols are normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    currency: String,
    asset: String,
}

impl Pair {
    /// Create a new pair.
    #[must_use]
    pub fn new(currency: impl Into<String>, asset: impl Into<String>) -> Self {
        Self {
            currency: currency.into().to_uppercase(),
            asset: asset.into().to_uppercase(),
        }
    }

    /// Quote currency.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Traded asset.
    #[must_use]
    pub fn asset(&self) -> &str {
        &self.asset
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.currency, self.asset)
    }
}
