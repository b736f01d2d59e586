//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::config_validation::validate_config;
use crate::domain::error::TrendsimError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::indicator::psar::PsarParams;
use crate::domain::screen::{ScreenInput, ScreenOutcome, rank_by_return, screen};
use crate::domain::signal::{SignalConfig, align_external};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "trendsim", about = "Trend-following strategy backtester")]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest one symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>.csv files
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        symbol: String,
        /// Blend in <SYMBOL>_signals.csv probabilities
        #[arg(long)]
        signals: bool,
    },
    /// Backtest many symbols in parallel and rank them
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// Comma-separated list; defaults to every symbol in the data directory
        #[arg(long)]
        symbols: Option<String>,
        #[arg(long)]
        signals: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            symbol,
            signals,
        } => run_backtest_command(&config, &data, &symbol, signals),
        Command::Screen {
            config,
            data,
            symbols,
            signals,
        } => run_screen_command(&config, &data, symbols.as_deref(), signals),
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TrendsimError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Validated run configuration. Absent keys take their defaults.
pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, TrendsimError> {
    validate_config(adapter)?;

    let psar_defaults = PsarParams::default();
    let indicators = IndicatorConfig {
        atr_period: adapter.get_usize("indicators", "atr_period", 14),
        supertrend_multiplier: adapter.get_double("indicators", "supertrend_multiplier", 3.0),
        adx_period: adapter.get_usize("indicators", "adx_period", 14),
        psar: PsarParams {
            af_start: adapter.get_double("indicators", "psar_af_start", psar_defaults.af_start),
            af_increment: adapter.get_double(
                "indicators",
                "psar_af_increment",
                psar_defaults.af_increment,
            ),
            af_max: adapter.get_double("indicators", "psar_af_max", psar_defaults.af_max),
        },
    };

    let signals = SignalConfig {
        adx_threshold: adapter.get_double("signals", "adx_threshold", 25.0),
        adx_strong_threshold: adapter.get_double("signals", "adx_strong_threshold", 40.0),
        momentum_extreme: adapter.get_double("signals", "momentum_extreme", 0.6),
        external_veto: adapter.get_double("signals", "external_veto", 0.35),
        external_confirm: adapter.get_double("signals", "external_confirm", 0.65),
    };

    let d = ExecutionConfig::default();
    let execution = ExecutionConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", d.initial_capital),
        position_size_pct: adapter.get_double("backtest", "position_size_pct", d.position_size_pct),
        max_exposure_pct: adapter.get_double("backtest", "max_exposure_pct", d.max_exposure_pct),
        stop_loss_pct: adapter.get_double("backtest", "stop_loss_pct", d.stop_loss_pct),
        take_profit_pct: adapter.get_double("backtest", "take_profit_pct", d.take_profit_pct),
        commission_pct: adapter.get_double("backtest", "commission_pct", d.commission_pct),
        commission_fixed: adapter.get_double("backtest", "commission_fixed", d.commission_fixed),
        slippage_pct: adapter.get_double("backtest", "slippage_pct", d.slippage_pct),
        volume_lookback: adapter.get_usize("backtest", "volume_lookback", d.volume_lookback),
        volume_spike_ratio: adapter.get_double(
            "backtest",
            "volume_spike_ratio",
            d.volume_spike_ratio,
        ),
        max_volume_multiplier: adapter.get_double(
            "backtest",
            "max_volume_multiplier",
            d.max_volume_multiplier,
        ),
        allow_short: adapter.get_bool("backtest", "allow_short", d.allow_short),
    };

    Ok(BacktestConfig {
        indicators,
        signals,
        execution,
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.0),
        equity_curve_points: adapter.get_usize("backtest", "equity_curve_points", 500),
    })
}

pub fn external_column(adapter: &dyn ConfigPort) -> usize {
    adapter.get_usize("signals", "external_column", 1)
}

/// Fetch, check and run one symbol. `external_column` enables external
/// signals read from that column.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    bt_config: &BacktestConfig,
    symbol: &str,
    external_column: Option<usize>,
) -> Result<BacktestResult, TrendsimError> {
    let input = fetch_input(data_port, symbol, external_column)?;
    input
        .series
        .require_len(bt_config.indicators.longest_lookback())?;
    run_backtest(&input.series, input.external.as_deref(), bt_config)
}

fn fetch_input(
    data_port: &dyn DataPort,
    symbol: &str,
    external_column: Option<usize>,
) -> Result<ScreenInput, TrendsimError> {
    let series = data_port.fetch_bars(symbol)?;
    let external = match external_column {
        Some(column) => match data_port.fetch_external_signals(symbol, column)? {
            Some(dated) => Some(align_external(&series, &dated)),
            None => {
                warn!(symbol, "no external signal table; running on indicators only");
                None
            }
        },
        None => None,
    };
    Ok(ScreenInput { series, external })
}

/// Screen `symbols` in input order. Fetch failures are reported per symbol
/// alongside run failures.
pub fn run_screen_pipeline(
    data_port: &dyn DataPort,
    bt_config: &BacktestConfig,
    symbols: &[String],
    external_column: Option<usize>,
) -> Vec<ScreenOutcome> {
    let mut slots: Vec<Option<ScreenOutcome>> = Vec::with_capacity(symbols.len());
    let mut inputs = Vec::new();
    for symbol in symbols {
        match fetch_input(data_port, symbol, external_column) {
            Ok(input) => {
                inputs.push(input);
                slots.push(None);
            }
            Err(e) => {
                warn!(symbol = symbol.as_str(), error = %e, "symbol skipped");
                slots.push(Some(ScreenOutcome {
                    symbol: symbol.clone(),
                    result: Err(e),
                }));
            }
        }
    }

    let mut screened = screen(&inputs, bt_config).into_iter();
    slots
        .into_iter()
        .filter_map(|slot| slot.or_else(|| screened.next()))
        .collect()
}

pub fn resolve_symbols(
    symbol_override: Option<&str>,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, TrendsimError> {
    if let Some(list) = symbol_override {
        return Ok(list
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect());
    }
    data_port.list_symbols()
}

fn run_backtest_command(
    config_path: &Path,
    data_dir: &Path,
    symbol: &str,
    use_signals: bool,
) -> Result<(), TrendsimError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter)?;
    let column = use_signals.then(|| external_column(&adapter));

    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let result = run_backtest_pipeline(&data_port, &bt_config, &symbol.to_uppercase(), column)?;
    print_summary(&result);
    Ok(())
}

fn run_screen_command(
    config_path: &Path,
    data_dir: &Path,
    symbols: Option<&str>,
    use_signals: bool,
) -> Result<(), TrendsimError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter)?;
    let column = use_signals.then(|| external_column(&adapter));

    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = resolve_symbols(symbols, &data_port)?;
    if symbols.is_empty() {
        return Err(TrendsimError::Data {
            reason: format!("no symbols found in {}", data_dir.display()),
        });
    }

    info!(symbols = symbols.len(), "screening");
    let outcomes = run_screen_pipeline(&data_port, &bt_config, &symbols, column);
    print_screen(&outcomes);
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), TrendsimError> {
    let adapter = load_config(config_path)?;
    let config = build_backtest_config(&adapter)?;
    println!("Configuration is valid.");
    println!(
        "  indicators: ATR({}) x{} ADX({}) PSAR({}, {}, {})",
        config.indicators.atr_period,
        config.indicators.supertrend_multiplier,
        config.indicators.adx_period,
        config.indicators.psar.af_start,
        config.indicators.psar.af_increment,
        config.indicators.psar.af_max,
    );
    println!(
        "  minimum bars: {}",
        config.indicators.longest_lookback()
    );
    Ok(())
}

pub fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!("=== {} ({} bars) ===", result.symbol, result.bars);
    println!("Total Return:     {:.2}%", m.total_return_pct);
    println!("Buy & Hold:       {:.2}%", result.buy_and_hold_return_pct);
    println!("Annualized:       {:.2}%", m.annualized_return_pct);
    println!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    println!("Sortino Ratio:    {:.2}", m.sortino_ratio);
    println!("Calmar Ratio:     {:.2}", m.calmar_ratio);
    println!(
        "Max Drawdown:     -{:.1}% ({} bars)",
        m.max_drawdown_pct, m.max_drawdown_duration
    );
    println!(
        "Total Trades:     {} ({} long, {} short)",
        m.total_trades, m.long_trades, m.short_trades
    );
    println!("Win Rate:         {:.1}%", m.win_rate_pct);
    println!("Profit Factor:    {:.2}", m.profit_factor);
    println!("Total Costs:      {:.2}", m.total_costs);
    println!("Final Equity:     {:.2}", result.final_equity);

    let d = &result.diagnostics;
    if d.skipped_capital + d.skipped_exposure > 0 {
        println!(
            "Skipped Orders:   {} capital, {} exposure",
            d.skipped_capital, d.skipped_exposure
        );
    }

    if !result.trades.is_empty() {
        println!("\n=== Trades ===");
        for t in &result.trades {
            println!(
                "  {} {} x{}  {} @ {:.2} -> {} @ {:.2}  {:+.2} ({:+.2}%)",
                t.exit_reason,
                t.side,
                t.size,
                t.entry_date,
                t.entry_price,
                t.exit_date,
                t.exit_price,
                t.pnl,
                t.pnl_pct,
            );
        }
    }
}

fn print_screen(outcomes: &[ScreenOutcome]) {
    println!("=== Screen ===");
    for (rank, r) in rank_by_return(outcomes).iter().enumerate() {
        println!(
            "  {:>3}. {:<10} {:>8.2}%  sharpe {:>6.2}  dd -{:.1}%  {} trades",
            rank + 1,
            r.symbol,
            r.metrics.total_return_pct,
            r.metrics.sharpe_ratio,
            r.metrics.max_drawdown_pct,
            r.metrics.total_trades,
        );
    }
    for outcome in outcomes {
        if let Err(e) = &outcome.result {
            println!("  skipped {}: {}", outcome.symbol, e);
        }
    }
}
