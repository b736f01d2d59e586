//! Performance Analyzer: return, risk and trade statistics for one run.
//!
//! Percent-valued fields carry a `_pct` suffix and are in percent units.
//! Every ratio is guarded; degenerate inputs produce 0, never NaN or inf.

use super::portfolio::{EquityPoint, Portfolio};
use super::position::Side;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown_pct: f64,
    /// Longest run of bars spent below a prior equity peak.
    pub max_drawdown_duration: usize,
    pub total_trades: usize,
    pub long_trades: usize,
    pub short_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate_pct: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_bars_held: f64,
    pub total_costs: f64,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 && denominator.is_finite() {
        let r = numerator / denominator;
        if r.is_finite() { r } else { 0.0 }
    } else {
        0.0
    }
}

impl Metrics {
    /// `risk_free_rate` is annual, as a fraction.
    pub fn compute(portfolio: &Portfolio, risk_free_rate: f64) -> Self {
        let equity_curve = &portfolio.equity_curve;
        let trades = &portfolio.trades;
        let initial_capital = portfolio.initial_capital;

        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);
        let total_return = ratio(final_equity - initial_capital, initial_capital);
        let annualized_return = annualize(total_return, equity_curve.len());

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(equity_curve, daily_rf);
        let calmar_ratio = ratio(annualized_return, max_drawdown.abs());

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut long_trades = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_bars_held = 0usize;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }
            if trade.side == Side::Long {
                long_trades += 1;
            }
            total_bars_held += trade.bars_held();
        }

        let total_trades = trades.len();
        let profit_factor = if total_losses > 0.0 {
            ratio(total_wins, total_losses)
        } else {
            total_wins
        };

        Metrics {
            total_return_pct: total_return * 100.0,
            annualized_return_pct: annualized_return * 100.0,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            max_drawdown_pct: max_drawdown * 100.0,
            max_drawdown_duration,
            total_trades,
            long_trades,
            short_trades: total_trades - long_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate_pct: ratio(trades_won as f64, total_trades as f64) * 100.0,
            profit_factor,
            avg_win: ratio(total_wins, trades_won as f64),
            avg_loss: ratio(total_losses, trades_lost as f64),
            largest_win,
            largest_loss,
            avg_bars_held: ratio(total_bars_held as f64, total_trades as f64),
            total_costs: portfolio.total_costs(),
        }
    }
}

/// `(1 + total)^(252 / bars) - 1`; a wiped-out account annualizes to -100%.
fn annualize(total_return: f64, bars: usize) -> f64 {
    if bars == 0 || !total_return.is_finite() {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    let r = growth.powf(TRADING_DAYS_PER_YEAR / bars as f64) - 1.0;
    if r.is_finite() { r } else { 0.0 }
}

/// Max drawdown as a fraction of the running peak, and its longest duration in bars.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            duration = 0;
            continue;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
        duration += 1;
        max_duration = max_duration.max(duration);
    }

    (max_dd, max_duration)
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint], daily_rf: f64) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| ratio(w[1].equity - w[0].equity, w[0].equity))
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let excess_return = mean - daily_rf;

    let sharpe = ratio(excess_return, stddev) * TRADING_DAYS_PER_YEAR.sqrt();

    let downside_variance = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum::<f64>()
        / n;
    let sortino = ratio(excess_return, downside_variance.sqrt()) * TRADING_DAYS_PER_YEAR.sqrt();

    (sharpe, sortino)
}

/// Buy-and-hold return over the series, in percent.
pub fn buy_and_hold_return_pct(first_close: f64, last_close: f64) -> f64 {
    ratio(last_close - first_close, first_close) * 100.0
}
