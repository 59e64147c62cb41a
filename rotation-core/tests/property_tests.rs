//! Property tests for classifier and sizer invariants.
//!
//! Uses proptest to verify:
//! 1. Totality: classify and size_position return for every input
//! 2. Stop-loss dominance: a large same-day drop is always Cash
//! 3. Zero floor: share counts are never negative or non-finite
//! 4. Monotonicity: more capital never lowers shares_from_risk,
//!    more ATR never raises the position
//! 5. At most one leveraged target is non-zero

use chrono::NaiveDate;
use proptest::prelude::*;
use rotation_core::{
    classify, reconcile_row, size_position, FeatureRow, Portfolio, Signal, SignalReason,
    StrategyConfig, Tickers,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn any_field() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        1 => Just(Some(0.0)),
        1 => Just(Some(-1.0)),
        1 => Just(Some(f64::INFINITY)),
        6 => (-1_000.0..1_000.0_f64).prop_map(Some),
    ]
}

fn arb_row() -> impl Strategy<Value = FeatureRow> {
    (
        (any_field(), any_field(), any_field(), any_field(), any_field()),
        (any_field(), any_field(), any_field(), any_field(), any_field()),
    )
        .prop_map(
            |((open, close, ema_fast, ema_slow, rsi), (macd, macd_signal, atr, close_bull, close_bear))| {
                FeatureRow {
                    date: NaiveDate::from_ymd_opt(2024, 6, 7).unwrap(),
                    open,
                    close,
                    ema_fast,
                    ema_slow,
                    rsi,
                    macd,
                    macd_signal,
                    atr,
                    close_bull,
                    close_bear,
                }
            },
        )
}

/// A strongly bullish row with a chosen open/close pair.
fn bullish_with(open: f64, close: f64) -> FeatureRow {
    FeatureRow {
        date: NaiveDate::from_ymd_opt(2024, 6, 7).unwrap(),
        open: Some(open),
        close: Some(close),
        ema_fast: Some(130.0),
        ema_slow: Some(100.0),
        rsi: Some(45.0),
        macd: Some(3.0),
        macd_signal: Some(1.0),
        atr: Some(2.0),
        close_bull: Some(60.0),
        close_bear: Some(15.0),
    }
}

fn sizing_row(atr: f64, price: f64) -> FeatureRow {
    FeatureRow {
        atr: Some(atr),
        close_bull: Some(price),
        ..FeatureRow::empty(NaiveDate::from_ymd_opt(2024, 6, 7).unwrap())
    }
}

fn arb_signal() -> impl Strategy<Value = Signal> {
    prop_oneof![Just(Signal::Bull), Just(Signal::Bear), Just(Signal::Cash)]
}

// ── 1. Totality & 3. Zero floor ──────────────────────────────────────

proptest! {
    #[test]
    fn classify_is_total(row in arb_row()) {
        let c = classify(&row, &StrategyConfig::default());
        if !row.is_complete() {
            prop_assert_eq!(c.signal, Signal::Cash);
            prop_assert_eq!(c.reason, SignalReason::IncompleteRow);
        }
    }

    #[test]
    fn size_is_never_negative(
        row in arb_row(),
        capital in prop_oneof![Just(f64::NAN), Just(0.0), -1e6..1e7_f64],
        signal in arb_signal(),
    ) {
        let size = size_position(&row, capital, signal, &StrategyConfig::default());
        prop_assert!(size.shares >= 0.0);
        prop_assert!(size.shares.is_finite());
        if signal == Signal::Cash {
            prop_assert_eq!(size.shares, 0.0);
        }
    }
}

// ── 2. Stop-loss dominance ───────────────────────────────────────────

proptest! {
    #[test]
    fn large_drop_is_always_cash(open in 10.0..1_000.0_f64, drop in 0.0501..0.9_f64) {
        let row = bullish_with(open, open * (1.0 - drop));
        let c = classify(&row, &StrategyConfig::default());
        prop_assert_eq!(c.signal, Signal::Cash);
        prop_assert_eq!(c.reason, SignalReason::StopLoss);
    }

    #[test]
    fn small_drop_keeps_bull(open in 10.0..1_000.0_f64, drop in 0.0..0.049_f64) {
        let row = bullish_with(open, open * (1.0 - drop));
        prop_assert_eq!(classify(&row, &StrategyConfig::default()).signal, Signal::Bull);
    }
}

// ── 4. Monotonicity ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn more_capital_never_lowers_risk_shares(
        capital in 1.0..1e6_f64,
        extra in 0.0..1e6_f64,
        atr in 0.01..50.0_f64,
    ) {
        let config = StrategyConfig::default();
        let row = sizing_row(atr, 100.0);
        let low = size_position(&row, capital, Signal::Bull, &config);
        let high = size_position(&row, capital + extra, Signal::Bull, &config);
        prop_assert!(high.shares_from_risk >= low.shares_from_risk);
        prop_assert!(high.shares >= low.shares);
    }

    #[test]
    fn more_atr_never_raises_size(
        capital in 1.0..1e6_f64,
        atr in 0.01..50.0_f64,
        bump in 0.0..50.0_f64,
        price in 1.0..500.0_f64,
        risk in 0.001..1.0_f64,
    ) {
        let config = StrategyConfig {
            risk_fraction: risk,
            ..StrategyConfig::default()
        };
        let calm = size_position(&sizing_row(atr, price), capital, Signal::Bull, &config);
        let wild = size_position(&sizing_row(atr + bump, price), capital, Signal::Bull, &config);
        prop_assert!(wild.shares <= calm.shares);
    }
}

// ── 5. One leg at a time ─────────────────────────────────────────────

proptest! {
    #[test]
    fn at_most_one_target_leg(row in arb_row(), cash in 0.0..1e6_f64) {
        let portfolio = Portfolio::cash_only(cash);
        if let Ok(report) = reconcile_row(&row, &portfolio, &Tickers::default(), &StrategyConfig::default()) {
            prop_assert!(report.targets.bull_shares == 0.0 || report.targets.bear_shares == 0.0);
            prop_assert!(report.deltas.iter().all(|d| d.shares >= 0.0));
        }
    }
}
