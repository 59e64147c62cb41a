//! USD exchange-rate lookup for the optional converted-equity line.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FxError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0} from FX provider")]
    Http(u16),

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("no USD rate for {0}")]
    MissingRate(String),
}

/// One USD → `currency` rate per run.
pub trait FxSource: Send + Sync {
    fn usd_rate(&self, currency: &str) -> Result<f64, FxError>;
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    rates: HashMap<String, f64>,
}

/// Frankfurter (ECB reference rates) `latest` endpoint.
pub struct FrankfurterFx {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl FrankfurterFx {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.frankfurter.app";

    pub fn new() -> Result<Self, FxError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| FxError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn pick_rate(resp: LatestResponse, currency: &str) -> Result<f64, FxError> {
    match resp.rates.get(currency) {
        Some(&rate) if rate.is_finite() && rate > 0.0 => Ok(rate),
        Some(rate) => Err(FxError::ResponseFormat(format!(
            "implausible {currency} rate {rate}"
        ))),
        None => Err(FxError::MissingRate(currency.to_string())),
    }
}

impl FxSource for FrankfurterFx {
    fn usd_rate(&self, currency: &str) -> Result<f64, FxError> {
        let url = format!("{}/latest", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .get(&url)
            .query(&[("from", "USD"), ("to", currency)])
            .send()
            .map_err(|e| FxError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FxError::Http(status.as_u16()));
        }

        let latest: LatestResponse = resp
            .json()
            .map_err(|e| FxError::ResponseFormat(e.to_string()))?;
        pick_rate(latest, currency)
    }
}
