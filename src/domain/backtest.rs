//! One backtest run: indicators, signals, execution and metrics over a
//! single bar series.

use tracing::{info, warn};

use super::error::TrendsimError;
use super::execution::{ExecutionConfig, simulate};
use super::indicator::{IndicatorConfig, WarmupReport, compute_frames};
use super::metrics::{Metrics, buy_and_hold_return_pct};
use super::ohlcv::BarSeries;
use super::portfolio::{EquityPoint, MissedOrder, SkipReason};
use super::position::Trade;
use super::signal::{ExternalSignal, SignalConfig, generate_signals};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub indicators: IndicatorConfig,
    pub signals: SignalConfig,
    pub execution: ExecutionConfig,
    /// Annual, as a fraction.
    pub risk_free_rate: f64,
    /// Maximum points kept in the reported equity curve; 0 keeps all.
    pub equity_curve_points: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            indicators: IndicatorConfig::default(),
            signals: SignalConfig::default(),
            execution: ExecutionConfig::default(),
            risk_free_rate: 0.0,
            equity_curve_points: 500,
        }
    }
}

/// Recoverable conditions met during a run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunDiagnostics {
    pub warmup: Vec<WarmupReport>,
    /// Series shorter than the longest indicator lookback.
    pub insufficient: bool,
    pub skipped_capital: usize,
    pub skipped_exposure: usize,
    pub missed_orders: Vec<MissedOrder>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub bars: usize,
    pub metrics: Metrics,
    pub final_equity: f64,
    pub buy_and_hold_return_pct: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub diagnostics: RunDiagnostics,
}

pub fn run_backtest(
    series: &BarSeries,
    external: Option<&[Option<ExternalSignal>]>,
    config: &BacktestConfig,
) -> Result<BacktestResult, TrendsimError> {
    info!(symbol = series.symbol(), bars = series.len(), "backtest started");

    let indicators = compute_frames(series, &config.indicators);
    if indicators.insufficient {
        warn!(
            symbol = series.symbol(),
            bars = series.len(),
            lookback = config.indicators.longest_lookback(),
            "series shorter than indicator lookback; no signals will fire"
        );
    }

    let signals = generate_signals(&indicators.frames, &config.signals, external)?;
    let portfolio = simulate(series, &signals, &config.execution)?;
    let metrics = Metrics::compute(&portfolio, config.risk_free_rate);

    let first_close = series.first().close;
    let last_close = series.last().close;
    let final_equity = portfolio
        .equity_curve
        .last()
        .map(|p| p.equity)
        .unwrap_or(portfolio.cash);

    let diagnostics = RunDiagnostics {
        warmup: indicators.warmup,
        insufficient: indicators.insufficient,
        skipped_capital: portfolio.skipped(SkipReason::Capital),
        skipped_exposure: portfolio.skipped(SkipReason::Exposure),
        missed_orders: portfolio.missed_orders,
    };

    info!(
        symbol = series.symbol(),
        trades = metrics.total_trades,
        total_return_pct = metrics.total_return_pct,
        "backtest finished"
    );

    Ok(BacktestResult {
        symbol: series.symbol().to_string(),
        bars: series.len(),
        metrics,
        final_equity,
        buy_and_hold_return_pct: buy_and_hold_return_pct(first_close, last_close),
        trades: portfolio.trades,
        equity_curve: downsample_equity(&portfolio.equity_curve, config.equity_curve_points),
        diagnostics,
    })
}

/// Evenly spaced subset of at most `max_points` points, always keeping the
/// first and last. `max_points == 0` keeps everything; 1 is raised to 2 so
/// both ends survive (config validation rejects 1).
pub fn downsample_equity(curve: &[EquityPoint], max_points: usize) -> Vec<EquityPoint> {
    if max_points == 0 || curve.len() <= max_points {
        return curve.to_vec();
    }
    let keep = max_points.max(2);
    let last = curve.len() - 1;

    let mut out: Vec<EquityPoint> = Vec::with_capacity(keep);
    let mut prev: Option<usize> = None;
    for k in 0..keep {
        let idx = k * last / (keep - 1);
        if prev != Some(idx) {
            out.push(curve[idx].clone());
            prev = Some(idx);
        }
    }
    out
}
