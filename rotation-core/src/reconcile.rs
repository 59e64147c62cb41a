//! Delta reconciler: latest session + current holdings → recommendation.
//!
//! `Reconciler` is the whole pipeline behind one call. A fixed-capital run
//! with nothing to reconcile against is the same call with
//! `Portfolio::cash_only(capital)`.

use crate::classifier::{classify, Classification};
use crate::config::{ConfigError, StrategyConfig};
use crate::domain::{Leg, Portfolio, PriceBar, Signal, Tickers};
use crate::features::{FeatureEngine, FeatureRow};
use crate::sizer::{size_position, PositionSize};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Conditions under which no trustworthy report can be built.
#[derive(Debug, Error, PartialEq)]
pub enum ReconcileError {
    #[error("no price data for any of {primary}, {bull}, {bear}")]
    NoSessions {
        primary: String,
        bull: String,
        bear: String,
    },

    #[error("cannot value {shares} held shares of {ticker}: no close price on {date}")]
    UnpricedHolding {
        ticker: String,
        shares: f64,
        date: NaiveDate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

/// Instruction for one leveraged ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaInstruction {
    pub leg: Leg,
    pub ticker: String,
    pub action: TradeAction,
    /// Magnitude of the change, never negative.
    pub shares: f64,
}

impl DeltaInstruction {
    /// From a signed `target - current`.
    pub fn from_delta(leg: Leg, ticker: &str, delta: f64) -> Self {
        let action = if delta > 0.0 {
            TradeAction::Buy
        } else if delta < 0.0 {
            TradeAction::Sell
        } else {
            TradeAction::Hold
        };
        Self {
            leg,
            ticker: ticker.to_string(),
            action,
            shares: delta.abs(),
        }
    }

    /// Signed delta: positive buys, negative sells.
    pub fn signed(&self) -> f64 {
        match self.action {
            TradeAction::Buy => self.shares,
            TradeAction::Sell => -self.shares,
            TradeAction::Hold => 0.0,
        }
    }
}

/// Desired holdings for the next session. At most one leg is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetHoldings {
    pub bull_shares: f64,
    pub bear_shares: f64,
}

impl TargetHoldings {
    pub fn shares(&self, leg: Leg) -> f64 {
        match leg {
            Leg::Bull => self.bull_shares,
            Leg::Bear => self.bear_shares,
        }
    }
}

/// Latest close of each leveraged ticker.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LegPrices {
    pub bull: Option<f64>,
    pub bear: Option<f64>,
}

/// Complete output of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    /// Session the indicators were computed on.
    pub session_date: NaiveDate,
    /// Next weekday after the session; the day the trades apply to.
    pub effective_date: NaiveDate,
    pub tickers: Tickers,
    pub current: Portfolio,
    pub classification: Classification,
    pub equity_usd: f64,
    pub prices: LegPrices,
    pub targets: TargetHoldings,
    /// Bull first, then bear.
    pub deltas: Vec<DeltaInstruction>,
    /// Present when a leveraged leg was sized.
    pub sizing: Option<PositionSize>,
}

impl RecommendationReport {
    pub fn signal(&self) -> Signal {
        self.classification.signal
    }

    pub fn delta(&self, leg: Leg) -> Option<&DeltaInstruction> {
        self.deltas.iter().find(|d| d.leg == leg)
    }
}

/// Next weekday after `date`. Exchange holidays are not consulted.
pub fn next_trading_day(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
        next += Duration::days(1);
    }
    next
}

/// Reconcile one feature row against current holdings.
pub fn reconcile_row(
    row: &FeatureRow,
    portfolio: &Portfolio,
    tickers: &Tickers,
    config: &StrategyConfig,
) -> Result<RecommendationReport, ReconcileError> {
    let prices = LegPrices {
        bull: row.close_bull,
        bear: row.close_bear,
    };

    let equity_usd = portfolio
        .equity(prices.bull, prices.bear)
        .ok_or_else(|| unpriced_holding(portfolio, &prices, tickers, row.date))?;

    let classification = classify(row, config);

    let mut targets = TargetHoldings::default();
    let sizing = match classification.signal {
        Signal::Cash => None,
        signal => {
            let size = size_position(row, equity_usd, signal, config);
            if signal == Signal::Bull {
                targets.bull_shares = size.shares;
            } else {
                targets.bear_shares = size.shares;
            }
            Some(size)
        }
    };

    let deltas: Vec<DeltaInstruction> = Leg::ALL
        .iter()
        .map(|&leg| {
            DeltaInstruction::from_delta(
                leg,
                tickers.leg(leg),
                targets.shares(leg) - portfolio.shares(leg),
            )
        })
        .collect();

    for d in &deltas {
        debug!(ticker = %d.ticker, action = ?d.action, shares = d.shares, "delta");
    }

    Ok(RecommendationReport {
        session_date: row.date,
        effective_date: next_trading_day(row.date),
        tickers: tickers.clone(),
        current: *portfolio,
        classification,
        equity_usd,
        prices,
        targets,
        deltas,
        sizing,
    })
}

fn unpriced_holding(
    portfolio: &Portfolio,
    prices: &LegPrices,
    tickers: &Tickers,
    date: NaiveDate,
) -> ReconcileError {
    let leg = if portfolio.bull_shares != 0.0 && !prices.bull.is_some_and(f64::is_finite) {
        Leg::Bull
    } else {
        Leg::Bear
    };
    ReconcileError::UnpricedHolding {
        ticker: tickers.leg(leg).to_string(),
        shares: portfolio.shares(leg),
        date,
    }
}

/// The full pipeline for one strategy configuration.
pub struct Reconciler {
    config: StrategyConfig,
    tickers: Tickers,
    engine: FeatureEngine,
}

impl Reconciler {
    /// Validates the configuration; an invalid one never reaches the engine.
    pub fn new(config: StrategyConfig, tickers: Tickers) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = FeatureEngine::new(&config);
        Ok(Self {
            config,
            tickers,
            engine,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn tickers(&self) -> &Tickers {
        &self.tickers
    }

    /// Bars the primary needs before every indicator is defined.
    pub fn warmup_bars(&self) -> usize {
        self.engine.warmup_bars()
    }

    /// Latest feature row from the three price histories.
    pub fn latest_row(
        &self,
        primary: &[PriceBar],
        bull: &[PriceBar],
        bear: &[PriceBar],
    ) -> Result<FeatureRow, ReconcileError> {
        self.engine
            .latest_row(primary, bull, bear)
            .ok_or_else(|| ReconcileError::NoSessions {
                primary: self.tickers.primary.clone(),
                bull: self.tickers.bull.clone(),
                bear: self.tickers.bear.clone(),
            })
    }

    /// Indicators → classifier → sizer → deltas.
    pub fn recommend(
        &self,
        primary: &[PriceBar],
        bull: &[PriceBar],
        bear: &[PriceBar],
        portfolio: &Portfolio,
    ) -> Result<RecommendationReport, ReconcileError> {
        let row = self.latest_row(primary, bull, bear)?;
        if primary.len() <= self.warmup_bars() {
            info!(
                bars = primary.len(),
                needed = self.warmup_bars() + 1,
                "short {} history; indicators will be undefined",
                self.tickers.primary
            );
        }
        reconcile_row(&row, portfolio, &self.tickers, &self.config)
    }
}
