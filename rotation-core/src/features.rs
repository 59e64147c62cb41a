//! Feature engine: price bars in, one `FeatureRow` per primary bar out.
//!
//! Indicators run on the primary ticker only. The two leveraged closes are
//! joined by date afterwards, on the union of all three tickers' dates.

use crate::config::StrategyConfig;
use crate::domain::{Leg, PriceBar};
use crate::indicators::{Atr, Ema, Indicator, Macd, Rsi};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Indicator snapshot for one session, plus the leveraged legs' closes.
///
/// `None` means undefined (warmup, missing bar or a missing field upstream),
/// never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub atr: Option<f64>,
    pub close_bull: Option<f64>,
    pub close_bear: Option<f64>,
}

/// The fields the classifier needs, all defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompleteFeatures {
    pub open: f64,
    pub close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub atr: f64,
}

impl FeatureRow {
    /// A row with every field undefined.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            open: None,
            close: None,
            ema_fast: None,
            ema_slow: None,
            rsi: None,
            macd: None,
            macd_signal: None,
            atr: None,
            close_bull: None,
            close_bear: None,
        }
    }

    /// The required fields, or `None` if any is undefined. The leveraged
    /// closes are not required for classification.
    pub fn complete(&self) -> Option<CompleteFeatures> {
        Some(CompleteFeatures {
            open: self.open?,
            close: self.close?,
            ema_fast: self.ema_fast?,
            ema_slow: self.ema_slow?,
            rsi: self.rsi?,
            macd: self.macd?,
            macd_signal: self.macd_signal?,
            atr: self.atr?,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.complete().is_some()
    }

    pub fn leg_close(&self, leg: Leg) -> Option<f64> {
        match leg {
            Leg::Bull => self.close_bull,
            Leg::Bear => self.close_bear,
        }
    }
}

/// NaN and infinities become `None`.
fn defined(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Computes the primary ticker's indicator set.
pub struct FeatureEngine {
    indicators: [Box<dyn Indicator>; 6],
}

impl FeatureEngine {
    /// Build from validated strategy parameters.
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            indicators: [
                Box::new(Ema::new(config.fast_window)),
                Box::new(Ema::new(config.slow_window)),
                Box::new(Rsi::new(config.rsi_window)),
                Box::new(Macd::line(config.macd_fast, config.macd_slow, config.macd_signal)),
                Box::new(Macd::signal(config.macd_fast, config.macd_slow, config.macd_signal)),
                Box::new(Atr::new(config.atr_window)),
            ],
        }
    }

    /// Longest warmup of any indicator, in bars.
    pub fn warmup_bars(&self) -> usize {
        self.indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
    }

    /// One row per bar, in input order. Short input never fails; it just
    /// yields rows whose slow indicators are undefined.
    pub fn compute(&self, bars: &[PriceBar]) -> Vec<FeatureRow> {
        let series: Vec<Vec<f64>> = self.indicators.iter().map(|i| i.compute(bars)).collect();
        bars.iter()
            .enumerate()
            .map(|(i, bar)| FeatureRow {
                date: bar.date,
                open: defined(bar.open),
                close: defined(bar.close),
                ema_fast: defined(series[0][i]),
                ema_slow: defined(series[1][i]),
                rsi: defined(series[2][i]),
                macd: defined(series[3][i]),
                macd_signal: defined(series[4][i]),
                atr: defined(series[5][i]),
                close_bull: None,
                close_bear: None,
            })
            .collect()
    }

    /// Feature row for the most recent date any of the three tickers traded,
    /// with both leveraged closes joined in.
    ///
    /// If the primary has no bar on that date the row is fully undefined
    /// apart from the leg closes. Returns `None` only when all inputs are empty.
    pub fn latest_row(
        &self,
        primary: &[PriceBar],
        bull: &[PriceBar],
        bear: &[PriceBar],
    ) -> Option<FeatureRow> {
        let last_date = [primary, bull, bear]
            .iter()
            .filter_map(|bars| bars.iter().map(|b| b.date).max())
            .max()?;

        let mut row = self
            .compute(primary)
            .into_iter()
            .rev()
            .find(|r| r.date == last_date)
            .unwrap_or_else(|| FeatureRow::empty(last_date));

        row.close_bull = close_on(bull, last_date);
        row.close_bear = close_on(bear, last_date);
        Some(row)
    }
}

fn close_on(bars: &[PriceBar], date: NaiveDate) -> Option<f64> {
    bars.iter()
        .rev()
        .find(|b| b.date == date)
        .and_then(|b| defined(b.close))
}
