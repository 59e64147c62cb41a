//! Rotation Core: signal, sizing and reconciliation pipeline.
//!
//! This crate is pure and synchronous; it performs no I/O:
//! - Domain types (price bars, holdings, signals, tickers)
//! - Indicator engine (EMA, RSI, MACD, ATR) producing `FeatureRow`s
//! - Rule-based regime classifier with fixed precedence
//! - ATR risk position sizer
//! - Delta reconciler producing a `RecommendationReport`
//! - Plain-text report formatter

pub mod classifier;
pub mod config;
pub mod domain;
pub mod features;
pub mod indicators;
pub mod reconcile;
pub mod report;
pub mod sizer;

pub use classifier::{classify, Classification, SignalReason};
pub use config::{ConfigError, ShareRounding, StrategyConfig};
pub use domain::{Leg, Portfolio, PriceBar, Signal, Tickers};
pub use features::{FeatureEngine, FeatureRow};
pub use reconcile::{
    next_trading_day, reconcile_row, DeltaInstruction, LegPrices, ReconcileError,
    RecommendationReport, Reconciler, TargetHoldings, TradeAction,
};
pub use report::{render, FxQuote};
pub use sizer::{size_position, PositionSize, SizingSkip};
