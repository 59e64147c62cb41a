//! Rotation CLI: daily leveraged-ETF rotation call.
//!
//! Commands:
//! - `run`: fetch prices and holdings, compute the call, send the report
//! - `signal`: print the latest classification without touching the account

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use rotation_core::{RecommendationReport, SignalReason};
use rotation_runner::{market_from_config, run_daily, run_signal, Collaborators, RunConfig};

#[derive(Parser)]
#[command(
    name = "rotation",
    about = "Rotation CLI: daily QQQ/TQQQ/SQQQ regime call and trade deltas"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute today's call against current holdings and deliver the report.
    Run {
        /// Path to a TOML config file.
        #[arg(long, default_value = "rotation.toml")]
        config: PathBuf,

        /// Run date (YYYY-MM-DD). History ends the day before. Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Print the report instead of sending it.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Print the latest classification using prices only.
    Signal {
        /// Path to a TOML config file.
        #[arg(long, default_value = "rotation.toml")]
        config: PathBuf,

        /// Run date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
}

fn main() -> Result<()> {
    // A missing .env is fine; real environment variables still apply.
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "loaded .env");
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            date,
            dry_run,
        } => run_cmd(&config, date.as_deref(), dry_run),
        Commands::Signal { config, date } => signal_cmd(&config, date.as_deref()),
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact()
        .with_env_filter(filter)
        .init();
}

fn run_date(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --date '{s}' (expected YYYY-MM-DD)")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn load_config(path: &Path) -> Result<RunConfig> {
    if !path.exists() {
        bail!(
            "config file {} not found (pass --config FILE)",
            path.display()
        );
    }
    let config = RunConfig::from_file(path)?;
    debug!(?config, "loaded config");
    Ok(config)
}

fn run_cmd(config_path: &Path, date: Option<&str>, dry_run: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let today = run_date(date)?;
    info!(%today, dry_run, "starting daily run");

    let collaborators = Collaborators::from_config(&config, dry_run)?;
    let outcome = run_daily(&config, today, &collaborators)?;

    info!(
        signal = %outcome.report.signal(),
        call_for = %outcome.report.effective_date,
        "run complete"
    );
    Ok(())
}

fn signal_cmd(config_path: &Path, date: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let today = run_date(date)?;

    // Only the market source is built; the account and sink are never touched.
    let market = market_from_config(&config)?;
    let report = run_signal(&config, today, market.as_ref())?;
    print_signal(&report);
    Ok(())
}

fn print_signal(report: &RecommendationReport) {
    let reason = match report.classification.reason {
        SignalReason::IncompleteRow => "indicators undefined (insufficient history)",
        SignalReason::StopLoss => "same-day drop at or beyond the stop threshold",
        SignalReason::BullTrend => "bull trend: fast/slow EMA above threshold, RSI neutral, MACD above signal",
        SignalReason::BearTrend => "bear trend: fast/slow EMA below threshold, RSI neutral, MACD below signal",
        SignalReason::Overbought => "RSI overbought",
        SignalReason::NoCondition => "no rule fired",
    };

    println!("=== Rotation Signal ===");
    println!("Session:     {}", report.session_date);
    println!("Call for:    {}", report.effective_date);
    println!(
        "Signal:      {}",
        report.tickers.signal_label(report.signal())
    );
    println!("Reason:      {reason}");
    let price = |p: Option<f64>| p.map_or_else(|| "n/a".to_string(), |p| format!("${p:.2}"));
    println!(
        "Prices:      {} {} | {} {}",
        report.tickers.bull,
        price(report.prices.bull),
        report.tickers.bear,
        price(report.prices.bear)
    );
}
