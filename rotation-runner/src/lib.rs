//! Rotation Runner: the once-per-day run around `rotation-core`.
//!
//! This crate builds on `rotation-core` to provide:
//! - Market data providers (Yahoo chart API, CSV import) and multi-ticker loading
//! - Account sources (Questrade session, holdings snapshot, fixed capital)
//! - Refresh-token storage
//! - USD exchange-rate lookup
//! - Notification sinks (stdout, Telegram)
//! - TOML run configuration
//! - `run_daily` / `run_signal` orchestration

pub mod account;
pub mod config;
pub mod data;
pub mod fx;
pub mod notify;
pub mod runner;

pub use account::{
    AccountError, AccountSnapshot, AccountSource, FileTokenStore, FixedCapital, QuestradeAccount,
    QuestradeSession, SnapshotFile, TokenStore,
};
pub use config::{
    AccountConfig, DataConfig, FxConfig, NotifyConfig, RunConfig, RunConfigError,
    DEFAULT_HISTORY_DAYS,
};
pub use data::{fetch_histories, CsvProvider, DataError, DataSource, MarketData, MarketHistory, YahooProvider};
pub use fx::{FrankfurterFx, FxError, FxSource};
pub use notify::{NotificationSink, NotifyError, StdoutSink, TelegramSink};
pub use runner::{
    market_from_config, run_daily, run_signal, Collaborators, RunError, RunOutcome,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn collaborators_are_send_sync() {
        assert_send::<Collaborators>();
        assert_sync::<Collaborators>();
        assert_send::<YahooProvider>();
        assert_sync::<YahooProvider>();
        assert_send::<QuestradeAccount>();
        assert_sync::<QuestradeAccount>();
        assert_send::<TelegramSink>();
        assert_sync::<TelegramSink>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<RunOutcome>();
        assert_sync::<RunOutcome>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
