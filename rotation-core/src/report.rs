//! Plain-text rendering of a `RecommendationReport` for notification.
//!
//! Formatting only; every number shown was decided by the reconciler.

use crate::reconcile::{RecommendationReport, TradeAction};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

const SEPARATOR_WIDTH: usize = 40;

/// One USD → `currency` conversion rate, used for an extra equity line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxQuote {
    pub currency: String,
    pub rate: f64,
}

/// Whole share counts print without decimals; fractional ones with two.
fn format_shares(shares: f64) -> String {
    if shares.fract() == 0.0 {
        format!("{shares:.0}")
    } else {
        format!("{shares:.2}")
    }
}

fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) => format!("${p:.2}"),
        None => "n/a".to_string(),
    }
}

/// Render the fixed-structure notification text.
pub fn render(report: &RecommendationReport, fx: Option<&FxQuote>) -> String {
    let sep = format!("\n{}\n", "-".repeat(SEPARATOR_WIDTH));
    let tickers = &report.tickers;
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "Current portfolio:\n{}_SHARES: {}\n{}_SHARES: {}\nCASH_USD: {:.2}{sep}",
        tickers.bear,
        format_shares(report.current.bear_shares),
        tickers.bull,
        format_shares(report.current.bull_shares),
        report.current.cash_usd,
    );
    let _ = write!(out, "DAILY CALL FOR: {}{sep}", report.effective_date.format("%Y-%m-%d"));
    let _ = write!(
        out,
        "STRATEGY SIGNAL: {}{sep}",
        tickers.signal_label(report.signal())
    );
    let _ = write!(out, "Total Equity (USD): ${:.2}", report.equity_usd);
    if let Some(quote) = fx {
        let _ = write!(
            out,
            "\nTotal Equity ({}): ${:.2}",
            quote.currency,
            report.equity_usd * quote.rate
        );
    }
    out.push_str(&sep);
    let _ = write!(
        out,
        "Latest Prices -> {}: {} | {}: {}{sep}",
        tickers.bull,
        format_price(report.prices.bull),
        tickers.bear,
        format_price(report.prices.bear),
    );

    out.push_str("REQUIRED TRADES (DELTA):");
    for delta in &report.deltas {
        let line = match delta.action {
            TradeAction::Buy => format!(" [BUY]  {}: {} shares", delta.ticker, format_shares(delta.shares)),
            TradeAction::Sell => format!(" [SELL] {}: {} shares", delta.ticker, format_shares(delta.shares)),
            TradeAction::Hold => format!(" [HOLD] {}: No Change", delta.ticker),
        };
        out.push('\n');
        out.push_str(&line);
    }

    out
}
