//! Offline account sources: a holdings snapshot file and fixed capital.

use super::{AccountError, AccountSnapshot, AccountSource};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Holdings read from a TOML file:
///
/// ```toml
/// cash_usd = 730.0
///
/// [positions]
/// TQQQ = 4
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl Into<String>) -> AccountError {
        AccountError::Snapshot {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

impl AccountSource for SnapshotFile {
    fn name(&self) -> &str {
        "snapshot_file"
    }

    fn get_current_holdings(&self, account_id: &str) -> Result<AccountSnapshot, AccountError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.error(e.to_string()))?;
        let snapshot: AccountSnapshot =
            toml::from_str(&content).map_err(|e| self.error(e.to_string()))?;

        if !snapshot.cash_usd.is_finite() {
            return Err(self.error("cash_usd must be a finite number"));
        }
        if let Some((symbol, _)) = snapshot.positions.iter().find(|(_, q)| !q.is_finite()) {
            return Err(self.error(format!("position {symbol} is not a finite quantity")));
        }

        info!(
            account_id,
            path = %self.path.display(),
            cash_usd = snapshot.cash_usd,
            positions = snapshot.positions.len(),
            "read holdings snapshot"
        );
        Ok(snapshot)
    }
}

/// A cash-only account with a fixed starting capital.
#[derive(Debug, Clone, Copy)]
pub struct FixedCapital {
    pub capital_usd: f64,
}

impl AccountSource for FixedCapital {
    fn name(&self) -> &str {
        "fixed_capital"
    }

    fn get_current_holdings(&self, _account_id: &str) -> Result<AccountSnapshot, AccountError> {
        Ok(AccountSnapshot {
            cash_usd: self.capital_usd,
            positions: HashMap::new(),
        })
    }
}
