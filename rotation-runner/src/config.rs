//! Run configuration loaded from TOML.
//!
//! ```toml
//! [strategy]
//! risk_fraction = 1.0
//! share_rounding = "whole"
//!
//! [tickers]
//! primary = "QQQ"
//! bull = "TQQQ"
//! bear = "SQQQ"
//!
//! [data]
//! provider = "yahoo"      # or "csv" with csv_dir = "data/"
//!
//! [account]
//! source = "questrade"
//! account_id = "12345678"
//! token_file = "secrets/questrade_refresh_token.txt"
//!
//! [notify]
//! sink = "telegram"
//!
//! [fx]
//! currency = "CAD"
//! ```
//!
//! Every section except `[account]` is optional. Secrets never live here;
//! the Telegram sink reads them from the environment.

use crate::data::DataSource;
use chrono::{Duration, NaiveDate};
use rotation_core::{ConfigError, StrategyConfig, Tickers};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// About five years of sessions plus slack for the 250-day warmup.
pub const DEFAULT_HISTORY_DAYS: u32 = 5 * 365 + 50;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("strategy: {0}")]
    Strategy(#[from] ConfigError),

    #[error("{section}: {reason}")]
    Invalid {
        section: &'static str,
        reason: String,
    },
}

fn invalid(section: &'static str, reason: impl Into<String>) -> RunConfigError {
    RunConfigError::Invalid {
        section,
        reason: reason.into(),
    }
}

/// Everything one daily run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub tickers: Tickers,
    #[serde(default)]
    pub data: DataConfig,
    pub account: AccountConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub fx: Option<FxConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub provider: DataSource,
    /// Directory of `<TICKER>.csv` files for the csv provider.
    pub csv_dir: Option<PathBuf>,
    /// Calendar days of history to fetch, ending the day before the run date.
    pub history_days: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            provider: DataSource::Yahoo,
            csv_dir: None,
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

/// Where holdings come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case", deny_unknown_fields)]
pub enum AccountConfig {
    /// Cash only; targets are sized off this amount and never reconciled.
    FixedCapital { capital_usd: f64 },
    /// Holdings from a TOML snapshot file.
    Snapshot {
        path: PathBuf,
        #[serde(default)]
        account_id: String,
    },
    /// Live brokerage holdings.
    Questrade {
        account_id: String,
        token_file: PathBuf,
    },
}

impl AccountConfig {
    pub fn account_id(&self) -> &str {
        match self {
            Self::FixedCapital { .. } => "",
            Self::Snapshot { account_id, .. } | Self::Questrade { account_id, .. } => account_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "sink", rename_all = "snake_case")]
pub enum NotifyConfig {
    #[default]
    Stdout,
    Telegram,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FxConfig {
    /// ISO 4217 code, e.g. "CAD".
    pub currency: String,
}

impl RunConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RunConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, RunConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks run before any network call.
    pub fn validate(&self) -> Result<(), RunConfigError> {
        self.strategy.validate()?;

        let tickers = self.tickers.all();
        if tickers.iter().any(|t| t.trim().is_empty()) {
            return Err(invalid("tickers", "ticker symbols must not be empty"));
        }
        if tickers[0] == tickers[1] || tickers[0] == tickers[2] || tickers[1] == tickers[2] {
            return Err(invalid("tickers", "primary, bull and bear must differ"));
        }

        if self.data.history_days == 0 {
            return Err(invalid("data", "history_days must be at least 1"));
        }
        if self.data.provider == DataSource::Csv && self.data.csv_dir.is_none() {
            return Err(invalid("data", "provider \"csv\" requires csv_dir"));
        }

        match &self.account {
            AccountConfig::FixedCapital { capital_usd } => {
                if !(capital_usd.is_finite() && *capital_usd >= 0.0) {
                    return Err(invalid("account", "capital_usd must be a non-negative number"));
                }
            }
            AccountConfig::Questrade { account_id, .. } => {
                if account_id.trim().is_empty() {
                    return Err(invalid("account", "questrade requires account_id"));
                }
            }
            AccountConfig::Snapshot { .. } => {}
        }

        if let Some(fx) = &self.fx {
            let code = fx.currency.as_str();
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(invalid("fx", format!("\"{code}\" is not an ISO currency code")));
            }
        }

        Ok(())
    }

    /// `[today - history_days, today)`.
    pub fn fetch_window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (today - Duration::days(i64::from(self.data.history_days)), today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotation_core::ShareRounding;

    const MINIMAL: &str = r#"
        [account]
        source = "fixed_capital"
        capital_usd = 730.0
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = RunConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.strategy, StrategyConfig::default());
        assert_eq!(config.tickers, Tickers::default());
        assert_eq!(config.data, DataConfig::default());
        assert_eq!(config.notify, NotifyConfig::Stdout);
        assert_eq!(config.fx, None);
        assert_eq!(
            config.account,
            AccountConfig::FixedCapital { capital_usd: 730.0 }
        );
    }

    #[test]
    fn full_config_parses() {
        let config = RunConfig::from_toml(
            r#"
            [strategy]
            risk_fraction = 0.5
            share_rounding = "cents"

            [tickers]
            primary = "SPY"
            bull = "UPRO"
            bear = "SPXU"

            [data]
            provider = "csv"
            csv_dir = "data"
            history_days = 900

            [account]
            source = "questrade"
            account_id = "12345678"
            token_file = "secrets/token.txt"

            [notify]
            sink = "telegram"

            [fx]
            currency = "CAD"
            "#,
        )
        .unwrap();

        assert_eq!(config.strategy.risk_fraction, 0.5);
        assert_eq!(config.strategy.share_rounding, ShareRounding::Cents);
        assert_eq!(config.strategy.slow_window, 250);
        assert_eq!(config.tickers.bull, "UPRO");
        assert_eq!(config.data.provider, DataSource::Csv);
        assert_eq!(config.data.history_days, 900);
        assert_eq!(config.account.account_id(), "12345678");
        assert_eq!(config.notify, NotifyConfig::Telegram);
        assert_eq!(config.fx.as_ref().map(|f| f.currency.as_str()), Some("CAD"));
    }

    #[test]
    fn account_section_is_required() {
        assert!(matches!(
            RunConfig::from_toml("[notify]\nsink = \"stdout\"\n"),
            Err(RunConfigError::Parse(_))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = format!("{MINIMAL}\n[data]\nprovder = \"csv\"\n");
        assert!(matches!(
            RunConfig::from_toml(&toml),
            Err(RunConfigError::Parse(_))
        ));
    }

    #[test]
    fn misspelled_section_keys_are_rejected() {
        let cases = [
            format!("[strategy]\nrisk_fracton = 0.02\n{MINIMAL}"),
            format!("[tickers]\nbul = \"UPRO\"\n{MINIMAL}"),
            "[account]\nsource = \"fixed_capital\"\ncapital_usd = 730.0\ncapital = 5.0\n".to_string(),
            "[account]\nsource = \"questrade\"\naccount_id = \"1\"\ntoken_file = \"t\"\ntoken = \"x\"\n"
                .to_string(),
        ];
        for toml in &cases {
            assert!(
                matches!(RunConfig::from_toml(toml), Err(RunConfigError::Parse(_))),
                "accepted: {toml}"
            );
        }
    }

    #[test]
    fn invalid_strategy_is_rejected() {
        let toml = format!("[strategy]\nrsi_neutral_low = 60.0\nrsi_neutral_high = 30.0\n{MINIMAL}");
        assert!(matches!(
            RunConfig::from_toml(&toml),
            Err(RunConfigError::Strategy(_))
        ));
    }

    #[test]
    fn csv_provider_needs_dir() {
        let toml = format!("{MINIMAL}\n[data]\nprovider = \"csv\"\n");
        assert!(matches!(
            RunConfig::from_toml(&toml),
            Err(RunConfigError::Invalid { section: "data", .. })
        ));
    }

    #[test]
    fn duplicate_tickers_are_rejected() {
        let toml = format!("[tickers]\nbull = \"QQQ\"\n{MINIMAL}");
        assert!(matches!(
            RunConfig::from_toml(&toml),
            Err(RunConfigError::Invalid { section: "tickers", .. })
        ));
    }

    #[test]
    fn negative_capital_is_rejected() {
        let toml = "[account]\nsource = \"fixed_capital\"\ncapital_usd = -1.0\n";
        assert!(matches!(
            RunConfig::from_toml(toml),
            Err(RunConfigError::Invalid { section: "account", .. })
        ));
    }

    #[test]
    fn bad_currency_code_is_rejected() {
        let toml = format!("{MINIMAL}\n[fx]\ncurrency = \"cad\"\n");
        assert!(matches!(
            RunConfig::from_toml(&toml),
            Err(RunConfigError::Invalid { section: "fx", .. })
        ));
    }

    #[test]
    fn fetch_window_ends_on_run_date() {
        let config = RunConfig::from_toml(MINIMAL).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let (start, end) = config.fetch_window(today);
        assert_eq!(end, today);
        assert_eq!((end - start).num_days(), i64::from(DEFAULT_HISTORY_DAYS));
    }

    #[test]
    fn shipped_example_config_is_valid() {
        let config = RunConfig::from_toml(include_str!("../../rotation.example.toml")).unwrap();
        assert_eq!(config.strategy, StrategyConfig::default());
        assert_eq!(config.data.history_days, DEFAULT_HISTORY_DAYS);
        assert!(matches!(config.account, AccountConfig::Questrade { .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = RunConfig::from_file(Path::new("/nonexistent/rotation.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rotation.toml"));
    }
}
