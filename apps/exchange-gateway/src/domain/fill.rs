//! Fills and their volume-weighted reduction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One exchange-reported trade against an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Executed amount of the asset.
    pub amount: Decimal,
    /// Execution rate (price).
    pub rate: Decimal,
    /// Execution time.
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    /// Create a fill.
    #[must_use]
    pub const fn new(amount: Decimal, rate: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            amount,
            rate,
            timestamp,
        }
    }
}

/// Volume-weighted summary of every fill of an order.
///
/// `amount == 0` means the order was not executed; it is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillSummary {
    /// Volume-weighted average price.
    pub price: Decimal,
    /// Cumulative executed amount.
    pub amount: Decimal,
    /// Time of the last fill, or the Unix epoch when unfilled.
    pub date: DateTime<Utc>,
}

impl FillSummary {
    /// Summary of an order that never executed.
    #[must_use]
    pub const fn unfilled() -> Self {
        Self {
            price: Decimal::ZERO,
            amount: Decimal::ZERO,
            date: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Reduce an ordered sequence of fills with a running VWAP.
    #[must_use]
    pub fn from_fills(fills: &[Fill]) -> Self {
        fills.iter().fold(Self::unfilled(), |summary, fill| summary.apply(fill))
    }

    /// Whether anything was executed.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    fn apply(self, fill: &Fill) -> Self {
        let amount = self.amount + fill.amount;
        if amount <= Decimal::ZERO {
            return Self {
                date: fill.timestamp,
                ..self
            };
        }

        // VWAP: new_avg = (old_avg * old_amount + rate * fill_amount) / new_amount
        let price = (self.price * self.amount + fill.rate * fill.amount) / amount;

        Self {
            price,
            amount,
            date: fill.timestamp,
        }
    }
}

impl Default for FillSummary {
    fn default() -> Self {
        Self::unfilled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn two_equal_fills_average_the_rates() {
        let fills = [
            Fill::new(dec!(1), dec!(10), at(100)),
            Fill::new(dec!(1), dec!(20), at(200)),
        ];

        let summary = FillSummary::from_fills(&fills);

        assert_eq!(summary.price, dec!(15));
        assert_eq!(summary.amount, dec!(2));
        assert_eq!(summary.date, at(200));
        assert!(summary.is_executed());
    }

    #[test]
    fn weights_by_volume() {
        let fills = [
            Fill::new(dec!(3), dec!(10), at(1)),
            Fill::new(dec!(1), dec!(30), at(2)),
        ];

        let summary = FillSummary::from_fills(&fills);

        assert_eq!(summary.price, dec!(15));
        assert_eq!(summary.amount, dec!(4));
    }

    #[test]
    fn empty_fills_are_unfilled() {
        let summary = FillSummary::from_fills(&[]);

        assert_eq!(summary.price, Decimal::ZERO);
        assert_eq!(summary.amount, Decimal::ZERO);
        assert_eq!(summary.date, DateTime::<Utc>::UNIX_EPOCH);
        assert!(!summary.is_executed());
        assert_eq!(summary, FillSummary::default());
    }

    #[test]
    fn zero_amount_fill_does_not_divide_by_zero() {
        let summary = FillSummary::from_fills(&[Fill::new(Decimal::ZERO, dec!(10), at(5))]);
        assert_eq!(summary.amount, Decimal::ZERO);
        assert_eq!(summary.price, Decimal::ZERO);
    }

    #[test]
    fn reduction_is_deterministic() {
        let fills = [
            Fill::new(dec!(0.5), dec!(101.3), at(1)),
            Fill::new(dec!(0.25), dec!(99.9), at(2)),
            Fill::new(dec!(0.25), dec!(100.1), at(3)),
        ];
        assert_eq!(FillSummary::from_fills(&fills), FillSummary::from_fills(&fills));
    }
}
