//! Ticker and portfolio views.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::pair::Pair;

/// Best bid and ask for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
}

/// Free balance of one currency or asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Symbol, uppercase.
    pub name: String,
    /// Free amount.
    pub amount: Decimal,
}

/// Free balances of the pair's currency and asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Quote currency holding.
    pub currency: Holding,
    /// Asset holding.
    pub asset: Holding,
}

impl Portfolio {
    /// Pick the pair's balances out of an exchange balance map.
    ///
    /// Symbols missing from the map count as zero.
    #[must_use]
    pub fn from_balances(pair: &Pair, balances: &HashMap<String, Decimal>) -> Self {
        let lookup = |name: &str| Holding {
            name: name.to_string(),
            amount: balances
                .iter()
                .find(|(symbol, _)| symbol.eq_ignore_ascii_case(name))
                .map_or(Decimal::ZERO, |(_, amount)| *amount),
        };

        Self {
            currency: lookup(pair.currency()),
            asset: lookup(pair.asset()),
        }
    }
}
