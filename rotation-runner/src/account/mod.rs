//! Account sources: where cash and open positions come from.
//!
//! Three sources share one trait so the reconciler never knows which mode
//! it runs in:
//! - `QuestradeAccount`: live brokerage holdings over a refreshed API session
//! - `SnapshotFile`: holdings recorded in a TOML file
//! - `FixedCapital`: a cash-only portfolio, nothing to reconcile against

pub mod questrade;
pub mod snapshot;
pub mod token;

pub use questrade::{QuestradeAccount, QuestradeSession};
pub use snapshot::{FixedCapital, SnapshotFile};
pub use token::{FileTokenStore, TokenStore};

use rotation_core::{Portfolio, Tickers};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from account sources and the token store. All are fatal to a run.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {endpoint}")]
    Http { status: u16, endpoint: String },

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("no {currency} balance reported for account {account_id}")]
    MissingCurrency { currency: String, account_id: String },

    #[error("token store: {0}")]
    TokenStore(String),

    #[error("holdings snapshot {}: {reason}", path.display())]
    Snapshot { path: PathBuf, reason: String },
}

/// Cash plus open quantity per symbol, as the account reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub cash_usd: f64,
    #[serde(default)]
    pub positions: HashMap<String, f64>,
}

impl AccountSnapshot {
    /// The two leveraged legs; every other symbol is ignored and an absent
    /// leg holds zero.
    pub fn portfolio(&self, tickers: &Tickers) -> Portfolio {
        Portfolio::from_positions(self.cash_usd, &self.positions, tickers)
    }
}

/// A source of current holdings, called once per run.
pub trait AccountSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn get_current_holdings(&self, account_id: &str) -> Result<AccountSnapshot, AccountError>;
}
