//! Regime signal and the ticker triple it selects between.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Regime classification for one feature row.
///
/// `Bull` and `Bear` each select one leveraged instrument to hold; `Cash`
/// holds neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Bull,
    Bear,
    Cash,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Bull => write!(f, "bull"),
            Signal::Bear => write!(f, "bear"),
            Signal::Cash => write!(f, "cash"),
        }
    }
}

/// Which leveraged instrument a quantity or price refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    Bull,
    Bear,
}

impl Leg {
    pub const ALL: [Leg; 2] = [Leg::Bull, Leg::Bear];
}

/// The benchmark and its two leveraged counterparts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tickers {
    /// Benchmark the indicators are computed on.
    pub primary: String,
    /// Leveraged long instrument.
    pub bull: String,
    /// Leveraged inverse instrument.
    pub bear: String,
}

impl Default for Tickers {
    fn default() -> Self {
        Self {
            primary: "QQQ".into(),
            bull: "TQQQ".into(),
            bear: "SQQQ".into(),
        }
    }
}

impl Tickers {
    pub fn leg(&self, leg: Leg) -> &str {
        match leg {
            Leg::Bull => &self.bull,
            Leg::Bear => &self.bear,
        }
    }

    /// Display label for a signal: the ticker it selects, or `CASH`.
    pub fn signal_label(&self, signal: Signal) -> &str {
        match signal {
            Signal::Bull => &self.bull,
            Signal::Bear => &self.bear,
            Signal::Cash => "CASH",
        }
    }

    /// All three tickers in fetch order.
    pub fn all(&self) -> [&str; 3] {
        [&self.primary, &self.bull, &self.bear]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_labels_follow_tickers() {
        let tickers = Tickers::default();
        assert_eq!(tickers.signal_label(Signal::Bull), "TQQQ");
        assert_eq!(tickers.signal_label(Signal::Bear), "SQQQ");
        assert_eq!(tickers.signal_label(Signal::Cash), "CASH");
    }

    #[test]
    fn tickers_deserialize_with_partial_override() {
        let tickers: Tickers = serde_json::from_str(r#"{"primary": "SPY"}"#).unwrap();
        assert_eq!(tickers.primary, "SPY");
        assert_eq!(tickers.bull, "TQQQ");
    }
}
