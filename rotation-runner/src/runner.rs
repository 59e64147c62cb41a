//! Daily run: wires market data, holdings, the core pipeline and delivery.
//!
//! Two entry points:
//! - `run_daily()`: fetch → holdings → recommend → render → send. Used by `rotation run`.
//! - `run_signal()`: fetch → classify against an empty cash-only portfolio.
//!   Used by `rotation signal`; never touches the account or a sink.
//!
//! Every collaborator is called at most once. Any fatal error returns before
//! the sink is reached, so no report built on partial data is ever sent.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use rotation_core::{
    render, ConfigError, FxQuote, Portfolio, ReconcileError, RecommendationReport, Reconciler,
};

use crate::account::{
    AccountError, AccountSource, FileTokenStore, FixedCapital, QuestradeAccount, SnapshotFile,
};
use crate::config::{AccountConfig, NotifyConfig, RunConfig, RunConfigError};
use crate::data::{fetch_histories, CsvProvider, DataError, DataSource, MarketData, YahooProvider};
use crate::fx::{FrankfurterFx, FxSource};
use crate::notify::{NotificationSink, NotifyError, StdoutSink, TelegramSink};

/// Errors from a run. Every variant aborts before notification.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] RunConfigError),
    #[error("strategy error: {0}")]
    Strategy(#[from] ConfigError),
    #[error("market data error: {0}")]
    Data(#[from] DataError),
    #[error("account error: {0}")]
    Account(#[from] AccountError),
    #[error("reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),
    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),
}

/// The external services one run talks to.
pub struct Collaborators {
    pub market: Box<dyn MarketData>,
    pub account: Box<dyn AccountSource>,
    pub fx: Option<Box<dyn FxSource>>,
    pub sink: Box<dyn NotificationSink>,
}

impl Collaborators {
    /// Build the production collaborators a config names. With `dry_run`
    /// the report goes to stdout whatever `[notify]` says.
    pub fn from_config(config: &RunConfig, dry_run: bool) -> Result<Self, RunError> {
        let market = market_from_config(config)?;

        let account: Box<dyn AccountSource> = match &config.account {
            AccountConfig::FixedCapital { capital_usd } => Box::new(FixedCapital {
                capital_usd: *capital_usd,
            }),
            AccountConfig::Snapshot { path, .. } => Box::new(SnapshotFile::new(path)),
            AccountConfig::Questrade { token_file, .. } => Box::new(QuestradeAccount::new(
                Box::new(FileTokenStore::new(token_file)),
            )?),
        };

        let fx: Option<Box<dyn FxSource>> = match &config.fx {
            None => None,
            Some(_) => match FrankfurterFx::new() {
                Ok(fx) => Some(Box::new(fx)),
                Err(e) => {
                    warn!(error = %e, "FX lookup disabled");
                    None
                }
            },
        };

        let sink: Box<dyn NotificationSink> = match (dry_run, config.notify) {
            (true, _) | (false, NotifyConfig::Stdout) => Box::new(StdoutSink),
            (false, NotifyConfig::Telegram) => Box::new(TelegramSink::from_env()?),
        };

        Ok(Self {
            market,
            account,
            fx,
            sink,
        })
    }
}

/// The market data provider a config names.
pub fn market_from_config(config: &RunConfig) -> Result<Box<dyn MarketData>, RunError> {
    match config.data.provider {
        DataSource::Yahoo => Ok(Box::new(YahooProvider::new()?)),
        DataSource::Csv => {
            let dir = config.data.csv_dir.clone().ok_or(RunConfigError::Invalid {
                section: "data",
                reason: "provider \"csv\" requires csv_dir".into(),
            })?;
            Ok(Box::new(CsvProvider::new(dir)))
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RecommendationReport,
    pub fx: Option<FxQuote>,
    /// Exactly the text handed to the sink.
    pub text: String,
}

/// Run the full daily pipeline for `today` and deliver the report.
///
/// History ends the day before `today`, so the report describes the last
/// completed session and the call is for the next weekday after it.
pub fn run_daily(
    config: &RunConfig,
    today: NaiveDate,
    collaborators: &Collaborators,
) -> Result<RunOutcome, RunError> {
    let reconciler = Reconciler::new(config.strategy.clone(), config.tickers.clone())?;
    let tickers = reconciler.tickers();

    let (start, end) = config.fetch_window(today);
    let history = fetch_histories(collaborators.market.as_ref(), tickers, start, end)?;
    if let Some(session) = history.last_session() {
        for ticker in history.missing_on(tickers, session) {
            warn!(ticker, %session, "no close on latest session");
        }
    }

    let account_id = config.account.account_id();
    let snapshot = collaborators.account.get_current_holdings(account_id)?;
    let portfolio = snapshot.portfolio(tickers);
    info!(
        source = collaborators.account.name(),
        cash_usd = portfolio.cash_usd,
        bull_shares = portfolio.bull_shares,
        bear_shares = portfolio.bear_shares,
        "loaded holdings"
    );

    let report = reconciler.recommend(&history.primary, &history.bull, &history.bear, &portfolio)?;
    info!(
        session = %report.session_date,
        call_for = %report.effective_date,
        signal = %report.signal(),
        reason = ?report.classification.reason,
        equity_usd = report.equity_usd,
        "recommendation ready"
    );

    let fx = lookup_fx(config, collaborators.fx.as_deref());
    let text = render(&report, fx.as_ref());

    collaborators.sink.send(&text)?;
    info!(sink = collaborators.sink.name(), "report delivered");

    Ok(RunOutcome { report, fx, text })
}

/// Classify the latest session without account access or delivery.
pub fn run_signal(
    config: &RunConfig,
    today: NaiveDate,
    market: &dyn MarketData,
) -> Result<RecommendationReport, RunError> {
    let reconciler = Reconciler::new(config.strategy.clone(), config.tickers.clone())?;
    let (start, end) = config.fetch_window(today);
    let history = fetch_histories(market, reconciler.tickers(), start, end)?;
    let report = reconciler.recommend(
        &history.primary,
        &history.bull,
        &history.bear,
        &Portfolio::default(),
    )?;
    Ok(report)
}

/// A failed lookup only drops the converted line.
fn lookup_fx(config: &RunConfig, source: Option<&dyn FxSource>) -> Option<FxQuote> {
    let currency = &config.fx.as_ref()?.currency;
    match source?.usd_rate(currency) {
        Ok(rate) => {
            info!(currency = %currency, rate, "fetched FX rate");
            Some(FxQuote {
                currency: currency.clone(),
                rate,
            })
        }
        Err(e) => {
            warn!(currency = %currency, error = %e, "FX lookup failed; omitting converted equity");
            None
        }
    }
}
