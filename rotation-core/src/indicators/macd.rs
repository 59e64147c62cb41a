//! Moving Average Convergence Divergence (MACD).
//!
//! Two series (separate Indicator instances):
//! - Line: EMA(close, fast) - EMA(close, slow)
//! - Signal: EMA(line, signal), seeded from the first defined line value
//!
//! Lookback: slow - 1 for the line, slow + signal - 2 for the signal.

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::PriceBar;

/// Which MACD series to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Line,
    Signal,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    line: MacdLine,
    name: String,
}

impl Macd {
    fn build(fast: usize, slow: usize, signal: usize, line: MacdLine) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(slow > fast, "MACD slow period must be > fast period");
        let prefix = match line {
            MacdLine::Line => "macd",
            MacdLine::Signal => "macd_signal",
        };
        Self {
            fast,
            slow,
            signal,
            line,
            name: format!("{prefix}_{fast}_{slow}_{signal}"),
        }
    }

    pub fn line(fast: usize, slow: usize, signal: usize) -> Self {
        Self::build(fast, slow, signal, MacdLine::Line)
    }

    pub fn signal(fast: usize, slow: usize, signal: usize) -> Self {
        Self::build(fast, slow, signal, MacdLine::Signal)
    }
}

/// MACD line from a close series.
fn macd_line(closes: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let fast_ema = ema_of_series(closes, fast);
    let slow_ema = ema_of_series(closes, slow);
    fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect()
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.line {
            MacdLine::Line => self.slow - 1,
            MacdLine::Signal => self.slow + self.signal - 2,
        }
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let line = macd_line(&closes, self.fast, self.slow);
        match self.line {
            MacdLine::Line => line,
            MacdLine::Signal => ema_of_series(&line, self.signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, Ema, DEFAULT_EPSILON};

    #[test]
    fn line_is_fast_minus_slow_ema() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let bars = make_bars(&closes);
        let line = Macd::line(3, 6, 2).compute(&bars);
        let fast = Ema::new(3).compute(&bars);
        let slow = Ema::new(6).compute(&bars);

        for i in 0..bars.len() {
            if i < 5 {
                assert!(line[i].is_nan(), "line defined during warmup at {i}");
            } else {
                assert_approx(line[i], fast[i] - slow[i], DEFAULT_EPSILON);
            }
        }
    }

    #[test]
    fn signal_starts_after_combined_warmup() {
        let closes: Vec<f64> = (0..60).map(|i| 50.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let macd = Macd::signal(12, 26, 9);
        let signal = macd.compute(&bars);
        assert_eq!(macd.lookback(), 33);
        assert!(signal[32].is_nan());
        assert!(!signal[33].is_nan());
    }

    #[test]
    fn rising_series_has_line_above_zero() {
        let closes: Vec<f64> = (0..60).map(|i| 50.0 + (i as f64).powf(1.3)).collect();
        let bars = make_bars(&closes);
        let line = Macd::line(12, 26, 9).compute(&bars);
        assert!(line[59] > 0.0);
    }

    #[test]
    fn names_distinguish_series() {
        assert_eq!(Macd::line(12, 26, 9).name(), "macd_12_26_9");
        assert_eq!(Macd::signal(12, 26, 9).name(), "macd_signal_12_26_9");
    }
}
