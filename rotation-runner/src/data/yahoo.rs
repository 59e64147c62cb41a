//! Yahoo Finance data provider.
//!
//! Fetches daily OHLC bars from Yahoo's v8 chart API. Handles rate limiting,
//! retries with exponential backoff and response parsing.
//!
//! Bars are dividend- and split-adjusted: every OHLC field is scaled by that
//! session's `adjclose / close`, so indicators see a continuous series.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! The CSV import path is the fallback when Yahoo is unavailable.

use super::provider::{normalize_bars, DataError, MarketData};
use chrono::NaiveDate;
use rotation_core::PriceBar;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Scale applied to one session's OHLC. Sessions without a usable
/// adjusted close are left as quoted.
fn adjustment_factor(close: Option<f64>, adj_close: Option<f64>) -> f64 {
    match (close, adj_close) {
        (Some(c), Some(a)) if c > 0.0 && a > 0.0 && a.is_finite() => a / c,
        _ => 1.0,
    }
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://query2.finance.yahoo.com";

    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Point at a different host (used by tests and mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Chart API URL for `[start, end)`: both bounds are UTC midnight.
    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map_or(0, |dt| dt.and_utc().timestamp());
        let start_ts = midnight(start);
        let end_ts = midnight(end);
        format!(
            "{}/v8/finance/chart/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Parse the chart API response into bars.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<PriceBar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // A range with no sessions comes back without timestamps.
        let Some(timestamps) = data.timestamp else {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);
        if adj_closes.is_none() {
            debug!(symbol, "no adjclose series; using quoted prices");
        }

        let mut bars = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();

            // Holidays and halted sessions come back all-null.
            if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
                continue;
            }

            let adj_close = adj_closes.as_ref().and_then(|a| a.get(i).copied().flatten());
            let factor = adjustment_factor(close, adj_close);
            let scaled = |v: Option<f64>| v.map_or(f64::NAN, |v| v * factor);

            bars.push(PriceBar {
                ticker: symbol.to_string(),
                date,
                open: scaled(open),
                high: scaled(high),
                low: scaled(low),
                close: scaled(close),
            });
        }

        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(bars)
    }

    /// Execute the chart request with bounded retries.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        let url = self.chart_url(symbol, start, end);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying chart request");
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        return Err(DataError::AccessBlocked);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        warn!(symbol, retry_after, "rate limited by Yahoo");
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if status.is_server_error() {
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    if !status.is_success() {
                        return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    return Self::parse_response(symbol, chart);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl MarketData for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        let bars = self.fetch_with_retry(ticker, start, end)?;
        Ok(normalize_bars(bars, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(symbol: &str, json: &str) -> Result<Vec<PriceBar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response(symbol, resp)
    }

    // 2024-03-04 and 2024-03-05, 14:30 UTC (US open), plus a null holiday row.
    const TWO_SESSIONS: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1709562600, 1709649000, 1709735400],
                "indicators": {
                    "quote": [{
                        "open":  [440.1, 438.0, null],
                        "high":  [442.0, 439.5, null],
                        "low":   [437.9, 433.2, null],
                        "close": [439.0, 434.1, null],
                        "volume": [1000, 2000, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_sessions_and_skips_null_rows() {
        let bars = parse("QQQ", TWO_SESSIONS).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ticker, "QQQ");
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(bars[1].close, 434.1);
    }

    #[test]
    fn partial_row_keeps_void_fields() {
        let json = r#"{"chart":{"result":[{"timestamp":[1709562600],
            "indicators":{"quote":[{"open":[null],"high":[1.0],"low":[0.5],"close":[0.8]}]}}],
            "error":null}}"#;
        let bars = parse("TQQQ", json).unwrap();
        assert!(bars[0].open.is_nan());
        assert_eq!(bars[0].close, 0.8);
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,
            "error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(
            parse("ZZZZ", json),
            Err(DataError::SymbolNotFound { symbol }) if symbol == "ZZZZ"
        ));
    }

    #[test]
    fn empty_range_is_symbol_not_found() {
        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(matches!(
            parse("SQQQ", json),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn other_chart_error_is_format_change() {
        let json = r#"{"chart":{"result":null,
            "error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(
            parse("QQQ", json),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn chart_url_uses_exclusive_midnight_bounds() {
        let provider = YahooProvider::new()
            .unwrap()
            .with_base_url("http://localhost:9/");
        let url = provider.chart_url(
            "QQQ",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        assert_eq!(
            url,
            "http://localhost:9/v8/finance/chart/QQQ?period1=1704067200&period2=1704153600\
             &interval=1d&includeAdjustedClose=true"
        );
    }

    #[test]
    fn adjclose_scales_every_price_field() {
        // Second session carries a 1% dividend adjustment; the first has none.
        let json = r#"{"chart":{"result":[{
            "timestamp": [1709562600, 1709649000],
            "indicators": {
                "quote": [{
                    "open":  [100.0, 200.0],
                    "high":  [110.0, 220.0],
                    "low":   [90.0, 180.0],
                    "close": [105.0, 200.0]
                }],
                "adjclose": [{"adjclose": [105.0, 198.0]}]
            }}],"error":null}}"#;
        let bars = parse("QQQ", json).unwrap();

        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].close, 105.0);

        let eps = 1e-9;
        assert!((bars[1].open - 198.0).abs() < eps);
        assert!((bars[1].high - 217.8).abs() < eps);
        assert!((bars[1].low - 178.2).abs() < eps);
        assert!((bars[1].close - 198.0).abs() < eps);
    }

    #[test]
    fn missing_adjclose_entry_keeps_quoted_prices() {
        let json = r#"{"chart":{"result":[{
            "timestamp": [1709562600],
            "indicators": {
                "quote": [{"open":[10.0],"high":[11.0],"low":[9.0],"close":[10.5]}],
                "adjclose": [{"adjclose": [null]}]
            }}],"error":null}}"#;
        let bars = parse("TQQQ", json).unwrap();
        assert_eq!(bars[0].open, 10.0);
        assert_eq!(bars[0].close, 10.5);
    }
}
