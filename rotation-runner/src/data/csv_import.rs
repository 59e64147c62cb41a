//! CSV import provider for offline runs.
//!
//! Reads `<dir>/<TICKER>.csv` with a header row of
//! `date,open,high,low,close` (extra columns such as `volume` are ignored).
//! Dates are `YYYY-MM-DD`; an empty price cell is a void field.

use super::provider::{normalize_bars, DataError, MarketData};
use chrono::NaiveDate;
use rotation_core::PriceBar;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
}

/// Reads one CSV file per ticker from a directory.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }

    fn read_file(path: &Path, ticker: &str) -> Result<Vec<PriceBar>, DataError> {
        let import_err = |reason: String| DataError::CsvImport {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| import_err(e.to_string()))?;

        let mut bars = Vec::new();
        for (line, record) in reader.deserialize::<CsvRow>().enumerate() {
            // +2: header row, 1-based lines
            let row = record.map_err(|e| import_err(format!("line {}: {e}", line + 2)))?;
            bars.push(PriceBar {
                ticker: ticker.to_string(),
                date: row.date,
                open: row.open.unwrap_or(f64::NAN),
                high: row.high.unwrap_or(f64::NAN),
                low: row.low.unwrap_or(f64::NAN),
                close: row.close.unwrap_or(f64::NAN),
            });
        }
        Ok(bars)
    }
}

impl MarketData for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch_price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }

        let bars = normalize_bars(Self::read_file(&path, ticker)?, start, end);
        debug!(ticker, path = %path.display(), bars = bars.len(), "read csv history");

        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }
        Ok(bars)
    }
}
