//! Regime classifier: one `FeatureRow` → one `Signal`.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. any required field undefined → Cash
//! 2. close / open <= 1 - drop_threshold → Cash (same-day stop-loss)
//! 3. trend_ratio > bullish, RSI in neutral band, MACD above signal → Bull
//! 4. trend_ratio < bearish, RSI in neutral band, MACD below signal → Bear
//! 5. RSI > overbought → Bear (mean reversion)
//! 6. otherwise → Cash
//!
//! The overbought rule is only reached after both trend rules fail.

use crate::config::StrategyConfig;
use crate::domain::Signal;
use crate::features::FeatureRow;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which rule produced the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalReason {
    /// A required field was undefined; Cash by default, not by decision.
    IncompleteRow,
    StopLoss,
    BullTrend,
    BearTrend,
    Overbought,
    NoCondition,
}

/// Signal plus the rule that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub signal: Signal,
    pub reason: SignalReason,
}

impl Classification {
    fn new(signal: Signal, reason: SignalReason) -> Self {
        Self { signal, reason }
    }

    /// True when Cash was forced by missing data rather than chosen by a rule.
    pub fn is_degraded(&self) -> bool {
        self.reason == SignalReason::IncompleteRow
    }
}

/// Total over every input: never panics, degrades to Cash.
pub fn classify(row: &FeatureRow, config: &StrategyConfig) -> Classification {
    let classification = evaluate(row, config);
    debug!(
        date = %row.date,
        signal = %classification.signal,
        reason = ?classification.reason,
        "classified feature row"
    );
    classification
}

fn evaluate(row: &FeatureRow, config: &StrategyConfig) -> Classification {
    let Some(f) = row.complete() else {
        return Classification::new(Signal::Cash, SignalReason::IncompleteRow);
    };

    if f.close / f.open <= 1.0 - config.drop_threshold {
        return Classification::new(Signal::Cash, SignalReason::StopLoss);
    }

    let trend_ratio = f.ema_fast / f.ema_slow;
    let momentum_bullish = f.macd > f.macd_signal;
    let momentum_bearish = f.macd < f.macd_signal;
    let neutral_zone = config.rsi_neutral_low < f.rsi && f.rsi < config.rsi_neutral_high;
    let overbought = f.rsi > config.rsi_overbought;

    if trend_ratio > config.bullish_threshold && neutral_zone && momentum_bullish {
        Classification::new(Signal::Bull, SignalReason::BullTrend)
    } else if trend_ratio < config.bearish_threshold && neutral_zone && momentum_bearish {
        Classification::new(Signal::Bear, SignalReason::BearTrend)
    } else if overbought {
        Classification::new(Signal::Bear, SignalReason::Overbought)
    } else {
        Classification::new(Signal::Cash, SignalReason::NoCondition)
    }
}
