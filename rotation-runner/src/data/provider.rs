//! Market data trait and structured error types.
//!
//! The MarketData trait abstracts over price sources (Yahoo Finance, CSV
//! import) so the run can swap implementations and tests can inject fakes.

use chrono::NaiveDate;
use rotation_core::PriceBar;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for market data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("data provider has blocked requests (HTTP 403)")]
    AccessBlocked,

    #[error("csv import failed for {}: {reason}", path.display())]
    CsvImport { path: PathBuf, reason: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Yahoo,
    Csv,
}

/// A daily price source.
///
/// `end` is exclusive: a fetch on day D returns sessions strictly before D.
/// A ticker with no data in range is `SymbolNotFound`; the loader decides
/// whether that is fatal.
pub trait MarketData: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Daily bars for `ticker` over `[start, end)`, ascending by date.
    fn fetch_price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError>;
}

/// Sort ascending, drop duplicate dates (last one wins) and anything outside
/// `[start, end)`.
pub fn normalize_bars(mut bars: Vec<PriceBar>, start: NaiveDate, end: NaiveDate) -> Vec<PriceBar> {
    bars.retain(|b| b.date >= start && b.date < end);
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}
