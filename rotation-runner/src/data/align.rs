//! Multi-ticker loading and date alignment.
//!
//! Fetches the primary, bull and bear histories from one provider and
//! reports the latest session and which tickers lack it. A ticker with no data in the window
//! becomes an empty series; any other data error fails the load.

use super::provider::{DataError, MarketData};
use chrono::NaiveDate;
use rotation_core::{PriceBar, Tickers};
use tracing::{info, warn};

/// Price histories for the three tickers over one fetch window.
#[derive(Debug, Clone, Default)]
pub struct MarketHistory {
    pub primary: Vec<PriceBar>,
    pub bull: Vec<PriceBar>,
    pub bear: Vec<PriceBar>,
}

impl MarketHistory {
    /// The latest session any ticker traded.
    pub fn last_session(&self) -> Option<NaiveDate> {
        [&self.primary, &self.bull, &self.bear]
            .iter()
            .filter_map(|bars| bars.last().map(|b| b.date))
            .max()
    }

    /// Tickers with no usable close on `date`.
    pub fn missing_on<'a>(&self, tickers: &'a Tickers, date: NaiveDate) -> Vec<&'a str> {
        let series = [
            (tickers.primary.as_str(), &self.primary),
            (tickers.bull.as_str(), &self.bull),
            (tickers.bear.as_str(), &self.bear),
        ];
        series
            .into_iter()
            .filter(|(_, bars)| {
                !bars
                    .iter()
                    .any(|b| b.date == date && b.close.is_finite())
            })
            .map(|(ticker, _)| ticker)
            .collect()
    }
}

/// Fetch all three tickers over `[start, end)`.
///
/// `SymbolNotFound` is downgraded to an empty series with a warning; every
/// other error is returned.
pub fn fetch_histories(
    provider: &dyn MarketData,
    tickers: &Tickers,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<MarketHistory, DataError> {
    let fetch = |ticker: &str| -> Result<Vec<PriceBar>, DataError> {
        match provider.fetch_price_history(ticker, start, end) {
            Ok(bars) => {
                info!(ticker, bars = bars.len(), provider = provider.name(), "fetched history");
                let suspect = bars.iter().filter(|b| !b.is_sane()).count();
                if suspect > 0 {
                    warn!(ticker, suspect, "bars with void or inconsistent OHLC");
                }
                Ok(bars)
            }
            Err(DataError::SymbolNotFound { .. }) => {
                warn!(ticker, %start, %end, "no data for ticker in window; treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    };

    Ok(MarketHistory {
        primary: fetch(&tickers.primary)?,
        bull: fetch(&tickers.bull)?,
        bear: fetch(&tickers.bear)?,
    })
}
