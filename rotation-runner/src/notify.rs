//! Notification sinks: where the finished report goes.

use serde::Serialize;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(&'static str),

    #[error("network error: {0}")]
    Network(String),

    #[error("telegram rejected the message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivers one formatted report. The sink never inspects the text.
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;
    fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Prints the report to standard output.
pub struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    fn send(&self, text: &str) -> Result<(), NotifyError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{text}")?;
        out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Telegram Bot API `sendMessage`.
pub struct TelegramSink {
    client: reqwest::blocking::Client,
    token: String,
    chat_id: String,
    api_base: String,
}

impl TelegramSink {
    pub const TOKEN_VAR: &'static str = "TELEGRAM_TOKEN";
    pub const CHAT_ID_VAR: &'static str = "TELEGRAM_CHAT_ID";
    pub const DEFAULT_API_BASE: &'static str = "https://api.telegram.org";

    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            token: token.into(),
            chat_id: chat_id.into(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
        })
    }

    /// Credentials from `TELEGRAM_TOKEN` and `TELEGRAM_CHAT_ID`.
    pub fn from_env() -> Result<Self, NotifyError> {
        let var = |name: &'static str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or(NotifyError::MissingCredential(name))
        };
        Self::new(var(Self::TOKEN_VAR)?, var(Self::CHAT_ID_VAR)?)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token
        )
    }
}

impl NotificationSink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    fn send(&self, text: &str) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(self.endpoint())
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            // The URL embeds the bot token; keep it out of the error text.
            .map_err(|e| NotifyError::Network(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(chat_id = %self.chat_id, chars = text.len(), "sent telegram message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_embeds_token() {
        let sink = TelegramSink::new("123:abc", "42")
            .unwrap()
            .with_api_base("http://localhost:9/");
        assert_eq!(sink.endpoint(), "http://localhost:9/bot123:abc/sendMessage");
    }

    #[test]
    fn message_body_shape() {
        let body = serde_json::to_value(SendMessage {
            chat_id: "42",
            text: "hello",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"chat_id": "42", "text": "hello"}));
    }

    #[test]
    fn stdout_sink_accepts_text() {
        StdoutSink.send("report").unwrap();
    }
}
