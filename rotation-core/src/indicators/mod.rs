//! Indicator implementations for the feature engine.
//!
//! Every indicator maps a full bar series to a numeric series of the same
//! length. Warmup and any value that cannot be computed are `f64::NAN`; the
//! feature engine turns those into `None` at the `FeatureRow` boundary, so
//! NaN never leaves this module.
//!
//! MACD is multi-series and is exposed as two named instances (line and
//! signal), keeping the single-series `Indicator` trait unchanged.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;

pub use atr::Atr;
pub use ema::Ema;
pub use macd::{Macd, MacdLine};
pub use rsi::Rsi;

use crate::domain::PriceBar;

/// A pure transform from bar history to one numeric series.
///
/// No value at index t may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_50", "atr_14").
    fn name(&self) -> &str;

    /// Number of leading bars that are NaN by construction.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire series. Output length == `bars.len()`.
    fn compute(&self, bars: &[PriceBar]) -> Vec<f64>;
}

/// Synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0. Dates are consecutive weekdays from 2024-01-02.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    use chrono::{Datelike, Weekday};
    let mut date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let bar = PriceBar {
                ticker: "QQQ".to_string(),
                date,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
            };
            date = date.succ_opt().unwrap();
            while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                date = date.succ_opt().unwrap();
            }
            bar
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
