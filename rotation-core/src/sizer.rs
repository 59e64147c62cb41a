//! ATR risk sizer.
//!
//! Volatility-scaled share count, capped by what the capital can buy.
//!
//! # Formula
//! ```text
//! risk_amount             = capital * risk_fraction
//! stop_distance           = atr_stop_multiple * ATR
//! shares_from_risk        = risk_amount / stop_distance
//! max_shares_from_capital = capital / (price * (1 + transaction_cost))
//! shares                  = round_down(min(shares_from_risk, max_shares_from_capital))
//! ```
//!
//! # Example
//! - Capital: $730, risk fraction 1.0, ATR 1.0, stop 2x ATR, price $50
//! - shares_from_risk = 730 / 2 = 365
//! - max_shares_from_capital = 730 / 50 = 14.6
//! - shares = floor(14.6) = 14

use crate::config::StrategyConfig;
use crate::domain::{Leg, Signal};
use crate::features::FeatureRow;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why a size came out as zero without the formula running to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingSkip {
    CashTarget,
    NoCapital,
    InvalidAtr,
    InvalidPrice,
    InvalidStopDistance,
}

/// Sizer output with its intermediate terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSize {
    pub shares: f64,
    pub shares_from_risk: f64,
    pub max_shares_from_capital: f64,
    /// Set when the size is a safe default rather than a computed value.
    pub skipped: Option<SizingSkip>,
}

impl PositionSize {
    fn skip(reason: SizingSkip) -> Self {
        debug!(?reason, "position size defaulted to zero");
        Self {
            shares: 0.0,
            shares_from_risk: 0.0,
            max_shares_from_capital: 0.0,
            skipped: Some(reason),
        }
    }
}

/// Target share count for `target` given `capital`.
///
/// Never panics and never returns a negative or non-finite share count;
/// every degenerate input yields zero with the reason recorded.
pub fn size_position(
    row: &FeatureRow,
    capital: f64,
    target: Signal,
    config: &StrategyConfig,
) -> PositionSize {
    let leg = match target {
        Signal::Bull => Leg::Bull,
        Signal::Bear => Leg::Bear,
        Signal::Cash => return PositionSize::skip(SizingSkip::CashTarget),
    };

    // Written as negated comparisons so NaN falls into the guard.
    if !(capital > 0.0) {
        return PositionSize::skip(SizingSkip::NoCapital);
    }

    let atr = match row.atr {
        Some(atr) if atr > 0.0 && atr.is_finite() => atr,
        _ => return PositionSize::skip(SizingSkip::InvalidAtr),
    };

    let price = match row.leg_close(leg) {
        Some(price) if price > 0.0 && price.is_finite() => price,
        _ => return PositionSize::skip(SizingSkip::InvalidPrice),
    };

    let stop_distance = config.atr_stop_multiple * atr;
    if !(stop_distance > 0.0) {
        return PositionSize::skip(SizingSkip::InvalidStopDistance);
    }

    let risk_amount = capital * config.risk_fraction;
    let shares_from_risk = risk_amount / stop_distance;
    let max_shares_from_capital = capital / (price * (1.0 + config.transaction_cost));

    let raw = shares_from_risk.min(max_shares_from_capital);
    let shares = if raw.is_finite() {
        config.share_rounding.apply(raw).max(0.0)
    } else {
        0.0
    };

    debug!(
        ?leg,
        capital,
        shares_from_risk,
        max_shares_from_capital,
        shares,
        "sized position"
    );

    PositionSize {
        shares,
        shares_from_risk,
        max_shares_from_capital,
        skipped: None,
    }
}
