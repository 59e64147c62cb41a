//! Strategy parameters and their startup validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from strategy parameter validation. Always fatal at startup.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be >= 1")]
    ZeroWindow { name: &'static str },

    #[error("{fast_name} ({fast}) must be shorter than {slow_name} ({slow})")]
    WindowOrder {
        fast_name: &'static str,
        fast: usize,
        slow_name: &'static str,
        slow: usize,
    },

    #[error("{name} must be in {range}, got {value}")]
    OutOfRange {
        name: &'static str,
        range: &'static str,
        value: f64,
    },

    #[error("bearish_threshold ({bearish}) must be below bullish_threshold ({bullish})")]
    TrendThresholds { bearish: f64, bullish: f64 },

    #[error(
        "RSI bands must satisfy 0 <= neutral_low ({low}) < neutral_high ({high}) <= overbought ({overbought}) <= 100"
    )]
    RsiBands { low: f64, high: f64, overbought: f64 },
}

/// How the sizer rounds a share count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareRounding {
    /// Floor to whole shares.
    #[default]
    Whole,
    /// Floor to hundredths, for brokers that support fractional shares.
    Cents,
}

impl ShareRounding {
    pub fn apply(self, shares: f64) -> f64 {
        match self {
            ShareRounding::Whole => shares.floor(),
            // Nudge absorbs representation error such as 0.29 * 100 = 28.999...
            ShareRounding::Cents => ((shares * 100.0) + 1e-9).floor() / 100.0,
        }
    }
}

/// Every tunable of the indicator engine, classifier and sizer.
///
/// `risk_fraction` defaults to 1.0: the whole equity is the sizing base,
/// not a fraction of it at risk. That is the live strategy's behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyConfig {
    pub fast_window: usize,
    pub slow_window: usize,
    pub rsi_window: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_window: usize,

    /// Same-day close/open drop that forces a flat position.
    pub drop_threshold: f64,
    pub bullish_threshold: f64,
    pub bearish_threshold: f64,
    pub rsi_neutral_low: f64,
    pub rsi_neutral_high: f64,
    pub rsi_overbought: f64,

    pub risk_fraction: f64,
    /// Stop distance in ATR multiples.
    pub atr_stop_multiple: f64,
    pub transaction_cost: f64,
    pub share_rounding: ShareRounding,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            fast_window: 50,
            slow_window: 250,
            rsi_window: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_window: 14,
            drop_threshold: 0.05,
            bullish_threshold: 1.05,
            bearish_threshold: 0.95,
            rsi_neutral_low: 30.0,
            rsi_neutral_high: 60.0,
            rsi_overbought: 70.0,
            risk_fraction: 1.0,
            atr_stop_multiple: 2.0,
            transaction_cost: 0.0,
            share_rounding: ShareRounding::Whole,
        }
    }
}

impl StrategyConfig {
    /// Check every parameter. Run once at startup, before any data is fetched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("fast_window", self.fast_window),
            ("slow_window", self.slow_window),
            ("rsi_window", self.rsi_window),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("atr_window", self.atr_window),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroWindow { name });
            }
        }

        if self.fast_window >= self.slow_window {
            return Err(ConfigError::WindowOrder {
                fast_name: "fast_window",
                fast: self.fast_window,
                slow_name: "slow_window",
                slow: self.slow_window,
            });
        }
        if self.macd_fast >= self.macd_slow {
            return Err(ConfigError::WindowOrder {
                fast_name: "macd_fast",
                fast: self.macd_fast,
                slow_name: "macd_slow",
                slow: self.macd_slow,
            });
        }

        check_range("risk_fraction", "(0, 1]", self.risk_fraction, |v| v > 0.0 && v <= 1.0)?;
        check_range("drop_threshold", "(0, 1)", self.drop_threshold, |v| v > 0.0 && v < 1.0)?;
        check_range("transaction_cost", "[0, inf)", self.transaction_cost, |v| v >= 0.0)?;
        check_range("atr_stop_multiple", "(0, inf)", self.atr_stop_multiple, |v| v > 0.0)?;
        check_range("bearish_threshold", "(0, inf)", self.bearish_threshold, |v| v > 0.0)?;

        if !(self.bearish_threshold < self.bullish_threshold) {
            return Err(ConfigError::TrendThresholds {
                bearish: self.bearish_threshold,
                bullish: self.bullish_threshold,
            });
        }

        let (low, high, overbought) = (self.rsi_neutral_low, self.rsi_neutral_high, self.rsi_overbought);
        if !(0.0 <= low && low < high && high <= overbought && overbought <= 100.0) {
            return Err(ConfigError::RsiBands {
                low,
                high,
                overbought,
            });
        }

        Ok(())
    }
}

fn check_range(
    name: &'static str,
    range: &'static str,
    value: f64,
    ok: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    // NaN fails every comparison, so it is rejected here too.
    if ok(value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, range, value })
    }
}
