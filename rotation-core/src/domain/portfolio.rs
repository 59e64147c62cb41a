//! Portfolio: current holdings as reported by the broker.

use super::signal::{Leg, Tickers};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current cash and leveraged-leg holdings.
///
/// Read-only to the pipeline; only the broker changes it. Quantities are
/// `f64` because brokers report fractional open quantities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash_usd: f64,
    pub bull_shares: f64,
    pub bear_shares: f64,
}

impl Portfolio {
    /// Cash-only portfolio (fixed-capital mode, nothing to reconcile against).
    pub fn cash_only(cash_usd: f64) -> Self {
        Self {
            cash_usd,
            ..Self::default()
        }
    }

    /// Build from a broker's per-symbol open quantities. Absent symbols hold zero.
    pub fn from_positions(cash_usd: f64, positions: &HashMap<String, f64>, tickers: &Tickers) -> Self {
        let qty = |symbol: &str| positions.get(symbol).copied().unwrap_or(0.0);
        Self {
            cash_usd,
            bull_shares: qty(&tickers.bull),
            bear_shares: qty(&tickers.bear),
        }
    }

    pub fn shares(&self, leg: Leg) -> f64 {
        match leg {
            Leg::Bull => self.bull_shares,
            Leg::Bear => self.bear_shares,
        }
    }

    /// Total equity = cash + market value of both legs.
    ///
    /// Returns `None` when a leg with a non-zero holding has no usable price;
    /// a leg that is not held contributes nothing whatever its price.
    pub fn equity(&self, bull_price: Option<f64>, bear_price: Option<f64>) -> Option<f64> {
        let leg_value = |shares: f64, price: Option<f64>| -> Option<f64> {
            if shares == 0.0 {
                return Some(0.0);
            }
            price.filter(|p| p.is_finite()).map(|p| shares * p)
        };
        Some(
            self.cash_usd
                + leg_value(self.bear_shares, bear_price)?
                + leg_value(self.bull_shares, bull_price)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equity_with_no_positions() {
        let portfolio = Portfolio::cash_only(730.0);
        assert_eq!(portfolio.equity(None, None), Some(730.0));
    }

    #[test]
    fn equity_with_both_legs() {
        let portfolio = Portfolio {
            cash_usd: 100.0,
            bull_shares: 10.0,
            bear_shares: 4.0,
        };
        // 100 + 10 * 50 + 4 * 25 = 700
        assert_eq!(portfolio.equity(Some(50.0), Some(25.0)), Some(700.0));
    }

    #[test]
    fn equity_unknown_when_held_leg_has_no_price() {
        let portfolio = Portfolio {
            cash_usd: 100.0,
            bull_shares: 10.0,
            bear_shares: 0.0,
        };
        assert_eq!(portfolio.equity(None, Some(25.0)), None);
        assert_eq!(portfolio.equity(Some(f64::NAN), Some(25.0)), None);
    }

    #[test]
    fn from_positions_defaults_missing_to_zero() {
        let mut positions = HashMap::new();
        positions.insert("TQQQ".to_string(), 12.0);
        positions.insert("VFV.TO".to_string(), 3.0);
        let portfolio = Portfolio::from_positions(50.0, &positions, &Tickers::default());
        assert_eq!(portfolio.bull_shares, 12.0);
        assert_eq!(portfolio.bear_shares, 0.0);
        assert_eq!(portfolio.cash_usd, 50.0);
    }
}
