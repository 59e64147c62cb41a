//! Questrade brokerage account source.
//!
//! One run makes exactly one refresh-token exchange. The exchange returns a
//! short-lived access token, the API server to talk to and a rotated refresh
//! token, which is written back to the token store before any account call.
//! The session is an explicit value passed to each request; nothing is
//! cached between runs.

use super::token::TokenStore;
use super::{AccountError, AccountSnapshot, AccountSource};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Token exchange response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    api_server: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalancesResponse {
    per_currency_balances: Vec<CurrencyBalance>,
}

#[derive(Debug, Deserialize)]
struct CurrencyBalance {
    currency: String,
    cash: f64,
}

#[derive(Debug, Deserialize)]
struct PositionsResponse {
    positions: Vec<PositionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionEntry {
    symbol: String,
    open_quantity: f64,
}

/// An authenticated API session for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestradeSession {
    pub api_server: String,
    pub access_token: String,
}

impl QuestradeSession {
    /// `api_server` arrives with a trailing slash; tolerate either form.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_server.trim_end_matches('/'), path)
    }
}

/// Live holdings from a Questrade account.
pub struct QuestradeAccount {
    client: reqwest::blocking::Client,
    token_store: Box<dyn TokenStore>,
    login_url: String,
}

impl QuestradeAccount {
    pub const DEFAULT_LOGIN_URL: &'static str = "https://login.questrade.com";

    /// Holdings are reported in this currency's `cash` balance.
    const CASH_CURRENCY: &'static str = "USD";

    pub fn new(token_store: Box<dyn TokenStore>) -> Result<Self, AccountError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AccountError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            token_store,
            login_url: Self::DEFAULT_LOGIN_URL.to_string(),
        })
    }

    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = login_url.into();
        self
    }

    /// Exchange the stored refresh token for a session and persist the
    /// rotated refresh token.
    pub fn open_session(&self) -> Result<QuestradeSession, AccountError> {
        let refresh_token = self.token_store.get_token()?;
        let endpoint = format!(
            "{}/oauth2/token",
            self.login_url.trim_end_matches('/')
        );

        let resp = self
            .client
            .get(&endpoint)
            .query(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .map_err(|e| AccountError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(AccountError::Authentication(format!(
                "refresh token rejected (HTTP {status})"
            )));
        }
        if !status.is_success() {
            return Err(AccountError::Http {
                status: status.as_u16(),
                endpoint,
            });
        }

        let token: TokenResponse = resp
            .json()
            .map_err(|e| AccountError::ResponseFormat(format!("token response: {e}")))?;

        self.token_store.put_token(&token.refresh_token)?;
        info!(api_server = %token.api_server, "opened brokerage session");

        Ok(QuestradeSession {
            api_server: token.api_server,
            access_token: token.access_token,
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        session: &QuestradeSession,
        account_id: &str,
        path: &str,
    ) -> Result<T, AccountError> {
        let endpoint = session.url(path);
        let resp = self
            .client
            .get(&endpoint)
            .bearer_auth(&session.access_token)
            .send()
            .map_err(|e| AccountError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AccountError::Authentication(format!(
                "access token rejected by {endpoint}"
            )));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AccountError::UnknownAccount(account_id.to_string()));
        }
        if !status.is_success() {
            return Err(AccountError::Http {
                status: status.as_u16(),
                endpoint,
            });
        }

        resp.json()
            .map_err(|e| AccountError::ResponseFormat(format!("{path}: {e}")))
    }

    /// USD cash balance.
    pub fn cash_balance(
        &self,
        session: &QuestradeSession,
        account_id: &str,
    ) -> Result<f64, AccountError> {
        let path = format!("v1/accounts/{account_id}/balances");
        let balances: BalancesResponse = self.get_json(session, account_id, &path)?;
        usd_cash(balances, account_id)
    }

    /// Open quantity per symbol.
    pub fn positions(
        &self,
        session: &QuestradeSession,
        account_id: &str,
    ) -> Result<HashMap<String, f64>, AccountError> {
        let path = format!("v1/accounts/{account_id}/positions");
        let positions: PositionsResponse = self.get_json(session, account_id, &path)?;
        Ok(open_quantities(positions))
    }
}

fn usd_cash(balances: BalancesResponse, account_id: &str) -> Result<f64, AccountError> {
    balances
        .per_currency_balances
        .into_iter()
        .find(|b| b.currency == QuestradeAccount::CASH_CURRENCY)
        .map(|b| b.cash)
        .ok_or_else(|| AccountError::MissingCurrency {
            currency: QuestradeAccount::CASH_CURRENCY.to_string(),
            account_id: account_id.to_string(),
        })
}

/// Lots of the same symbol are summed.
fn open_quantities(positions: PositionsResponse) -> HashMap<String, f64> {
    let mut out = HashMap::new();
    for p in positions.positions {
        *out.entry(p.symbol).or_insert(0.0) += p.open_quantity;
    }
    out
}

impl AccountSource for QuestradeAccount {
    fn name(&self) -> &str {
        "questrade"
    }

    fn get_current_holdings(&self, account_id: &str) -> Result<AccountSnapshot, AccountError> {
        let session = self.open_session()?;
        let cash_usd = self.cash_balance(&session, account_id)?;
        let positions = self.positions(&session, account_id)?;
        debug!(account_id, cash_usd, ?positions, "brokerage holdings");
        Ok(AccountSnapshot {
            cash_usd,
            positions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_usd_cash_from_per_currency_balances() {
        let json = r#"{
            "perCurrencyBalances": [
                {"currency": "CAD", "cash": 12.5, "marketValue": 0, "totalEquity": 12.5},
                {"currency": "USD", "cash": 530.25, "marketValue": 200, "totalEquity": 730.25}
            ],
            "combinedBalances": []
        }"#;
        let balances: BalancesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(usd_cash(balances, "123").unwrap(), 530.25);
    }

    #[test]
    fn missing_usd_balance_is_an_error() {
        let json = r#"{"perCurrencyBalances": [{"currency": "CAD", "cash": 1.0}]}"#;
        let balances: BalancesResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            usd_cash(balances, "123"),
            Err(AccountError::MissingCurrency { .. })
        ));
    }

    #[test]
    fn positions_sum_by_symbol() {
        let json = r#"{"positions": [
            {"symbol": "TQQQ", "symbolId": 1, "openQuantity": 3, "currentPrice": 50.0},
            {"symbol": "TQQQ", "symbolId": 1, "openQuantity": 1, "currentPrice": 50.0},
            {"symbol": "VFV.TO", "symbolId": 2, "openQuantity": 10, "currentPrice": 120.0}
        ]}"#;
        let positions: PositionsResponse = serde_json::from_str(json).unwrap();
        let map = open_quantities(positions);
        assert_eq!(map["TQQQ"], 4.0);
        assert_eq!(map["VFV.TO"], 10.0);
        assert!(!map.contains_key("SQQQ"));
    }

    #[test]
    fn session_url_tolerates_trailing_slash() {
        let session = QuestradeSession {
            api_server: "https://api01.iq.questrade.com/".into(),
            access_token: "t".into(),
        };
        assert_eq!(
            session.url("v1/accounts/1/balances"),
            "https://api01.iq.questrade.com/v1/accounts/1/balances"
        );
    }
}
