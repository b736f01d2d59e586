//! Execution Engine: single-position trade simulation.
//!
//! Per bar, in order:
//! 1. stop-loss, then take-profit, against the close
//! 2. signal execution if no stop fired (reversals close first, then open)
//! 3. every fill pays commission and volume-scaled slippage
//! 4. new entries are sized under the exposure cap
//! 5. equity is marked at the close
//!
//! The last bar opens nothing and force-closes any open position before the
//! final mark.
//!
//! [`transition`] is the pure state-machine step; [`simulate`] drives it over a
//! bar series and owns the [`Portfolio`].

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::error::TrendsimError;
use super::ohlcv::{Bar, BarSeries};
use super::portfolio::{MissedOrder, Portfolio, SkipReason};
use super::position::{ExitReason, OpenPosition, Position, Side, Trade};
use super::signal::{Action, Signal};

/// Execution parameters. Percentages are in percent units (5.0 = 5%).
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub initial_capital: f64,
    pub position_size_pct: f64,
    pub max_exposure_pct: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub commission_pct: f64,
    pub commission_fixed: f64,
    pub slippage_pct: f64,
    pub volume_lookback: usize,
    pub volume_spike_ratio: f64,
    pub max_volume_multiplier: f64,
    pub allow_short: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            initial_capital: 100_000.0,
            position_size_pct: 10.0,
            max_exposure_pct: 25.0,
            stop_loss_pct: 5.0,
            take_profit_pct: 10.0,
            commission_pct: 0.1,
            commission_fixed: 1.0,
            slippage_pct: 0.05,
            volume_lookback: 20,
            volume_spike_ratio: 2.0,
            max_volume_multiplier: 3.0,
            allow_short: true,
        }
    }
}

/// commission = max(fixed fee, value * pct / 100)
pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    config
        .commission_fixed
        .max(trade_value * config.commission_pct / 100.0)
}

/// Slippage scale for bar `index`: the bar's volume relative to the mean of
/// the previous `volume_lookback` bars, divided by `volume_spike_ratio` and
/// clamped to `[1, max_volume_multiplier]`. 1.0 without usable history.
pub fn volume_multiplier(bars: &[Bar], index: usize, config: &ExecutionConfig) -> f64 {
    if index == 0 || index >= bars.len() || config.volume_lookback == 0 {
        return 1.0;
    }
    if config.volume_spike_ratio <= 0.0 {
        return 1.0;
    }

    let window = &bars[index.saturating_sub(config.volume_lookback)..index];
    let avg = window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64;
    if avg <= 0.0 {
        return 1.0;
    }

    let ratio = bars[index].volume / avg;
    (ratio / config.volume_spike_ratio).clamp(1.0, config.max_volume_multiplier.max(1.0))
}

/// Market state the transition function sees for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarContext {
    pub index: usize,
    pub date: NaiveDate,
    pub close: f64,
    pub volume_multiplier: f64,
    /// No entries on the final bar; it can only close.
    pub last_bar: bool,
}

/// One executed fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub slippage: f64,
    pub commission: f64,
}

/// Execution price for a fill at `reference`, moved against the trader.
pub fn slipped_price(reference: f64, buying: bool, ctx: &BarContext, config: &ExecutionConfig) -> f64 {
    let s = config.slippage_pct / 100.0 * ctx.volume_multiplier;
    if buying {
        reference * (1.0 + s)
    } else {
        reference * (1.0 - s)
    }
}

pub fn fill(size: u64, buying: bool, ctx: &BarContext, config: &ExecutionConfig) -> Fill {
    let price = slipped_price(ctx.close, buying, ctx, config);
    let slippage = size as f64 * (price - ctx.close).abs();
    let commission = calculate_commission(size as f64 * price, config);
    Fill {
        price,
        slippage,
        commission,
    }
}

/// Result of one state-machine step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub position: Position,
    pub cash: f64,
    pub closed: Option<Trade>,
    pub missed: Option<MissedOrder>,
}

impl Transition {
    fn unchanged(position: Position, cash: f64) -> Self {
        Transition {
            position,
            cash,
            closed: None,
            missed: None,
        }
    }
}

/// Close an open leg at the bar close. Returns the new cash and the trade.
pub fn close_position(
    position: Position,
    cash: f64,
    ctx: &BarContext,
    reason: ExitReason,
    config: &ExecutionConfig,
) -> (f64, Option<Trade>) {
    let (side, open) = match position {
        Position::Flat => return (cash, None),
        Position::Long(p) => (Side::Long, p),
        Position::Short(p) => (Side::Short, p),
    };

    let exit = fill(open.size, side == Side::Short, ctx, config);
    let size = open.size as f64;
    let cash = match side {
        Side::Long => cash + size * exit.price - exit.commission,
        // escrowed entry notional comes back with the price difference
        Side::Short => cash + size * (2.0 * open.entry_price - exit.price) - exit.commission,
    };

    let pnl = side.sign() * size * (exit.price - open.entry_price)
        - open.entry_commission
        - exit.commission;
    let costs = open.entry_costs() + exit.commission + exit.slippage;
    let notional = open.entry_notional();
    let pnl_pct = if notional > 0.0 {
        pnl / notional * 100.0
    } else {
        0.0
    };

    let trade = Trade {
        side,
        size: open.size,
        entry_date: open.entry_date,
        exit_date: ctx.date,
        entry_index: open.entry_index,
        exit_index: ctx.index,
        entry_price: open.entry_price,
        exit_price: exit.price,
        pnl,
        pnl_pct,
        gross_pnl: pnl + costs,
        costs,
        exit_reason: reason,
    };
    (cash, Some(trade))
}

/// Notional available for a new entry under the exposure cap.
pub fn entry_notional(capital: f64, current_exposure_pct: f64, config: &ExecutionConfig) -> f64 {
    let by_size = capital * config.position_size_pct / 100.0;
    let headroom = capital * (config.max_exposure_pct - current_exposure_pct) / 100.0;
    by_size.min(headroom)
}

/// Try to open `side` from a flat book.
pub fn open_position(
    side: Side,
    cash: f64,
    ctx: &BarContext,
    config: &ExecutionConfig,
) -> Result<(Position, f64), MissedOrder> {
    let missed = |reason| MissedOrder {
        index: ctx.index,
        date: ctx.date,
        side,
        reason,
    };

    // flat book: capital is cash and current exposure is zero
    let notional = entry_notional(cash, 0.0, config);
    if notional <= 0.0 {
        return Err(missed(SkipReason::Exposure));
    }

    let buying = side == Side::Long;
    let price = slipped_price(ctx.close, buying, ctx, config);
    if price <= 0.0 {
        return Err(missed(SkipReason::Capital));
    }
    let size = (notional / price).floor() as u64;
    if size == 0 {
        return Err(missed(SkipReason::Capital));
    }

    let entry = fill(size, buying, ctx, config);
    let total = size as f64 * entry.price + entry.commission;
    if total > cash {
        return Err(missed(SkipReason::Capital));
    }

    let (stop_loss, take_profit) = protective_levels(side, entry.price, config);
    let open = OpenPosition {
        entry_date: ctx.date,
        entry_index: ctx.index,
        entry_price: entry.price,
        size,
        stop_loss,
        take_profit,
        entry_commission: entry.commission,
        entry_slippage: entry.slippage,
    };
    let position = match side {
        Side::Long => Position::Long(open),
        Side::Short => Position::Short(open),
    };
    Ok((position, cash - total))
}

/// Stop-loss and take-profit prices; 0.0 when the percentage is disabled.
fn protective_levels(side: Side, entry: f64, config: &ExecutionConfig) -> (f64, f64) {
    let level = |pct: f64, favourable: bool| {
        if pct <= 0.0 {
            return 0.0;
        }
        let up = (side == Side::Long) == favourable;
        if up {
            entry * (1.0 + pct / 100.0)
        } else {
            entry * (1.0 - pct / 100.0)
        }
    };
    (
        level(config.stop_loss_pct, false),
        level(config.take_profit_pct, true),
    )
}

/// The pure per-bar state-machine step.
pub fn transition(
    position: Position,
    cash: f64,
    signal: &Signal,
    ctx: &BarContext,
    config: &ExecutionConfig,
) -> Transition {
    let stop = if position.should_stop_loss(ctx.close, config.stop_loss_pct) {
        Some(ExitReason::StopLoss)
    } else if position.should_take_profit(ctx.close, config.take_profit_pct) {
        Some(ExitReason::TakeProfit)
    } else {
        None
    };
    if let Some(reason) = stop {
        let (cash, closed) = close_position(position, cash, ctx, reason, config);
        return Transition {
            position: Position::Flat,
            cash,
            closed,
            missed: None,
        };
    }

    let target = match (signal.action, &position) {
        (Action::Hold, _) | (Action::Buy, Position::Long(_)) | (Action::Sell, Position::Short(_)) => {
            return Transition::unchanged(position, cash);
        }
        (Action::Buy, _) => Some(Side::Long),
        (Action::Sell, _) if config.allow_short => Some(Side::Short),
        (Action::Sell, _) => None,
    };

    let (cash, closed) = close_position(position, cash, ctx, ExitReason::Signal, config);
    let Some(side) = target.filter(|_| !ctx.last_bar) else {
        return Transition {
            position: Position::Flat,
            cash,
            closed,
            missed: None,
        };
    };

    match open_position(side, cash, ctx, config) {
        Ok((position, cash)) => Transition {
            position,
            cash,
            closed,
            missed: None,
        },
        Err(missed) => Transition {
            position: Position::Flat,
            cash,
            closed,
            missed: Some(missed),
        },
    }
}

/// Drive [`transition`] across the series.
///
/// `signals` are matched to bars by index; bars without a signal hold. A
/// signal indexed past the last bar is a validation error.
pub fn simulate(
    series: &BarSeries,
    signals: &[Signal],
    config: &ExecutionConfig,
) -> Result<Portfolio, TrendsimError> {
    let bars = series.bars();
    let mut by_bar: Vec<Option<&Signal>> = vec![None; bars.len()];
    for signal in signals {
        if signal.index >= bars.len() {
            return Err(TrendsimError::SignalIndexOutOfRange {
                index: signal.index,
                bars: bars.len(),
            });
        }
        by_bar[signal.index] = Some(signal);
    }

    let mut portfolio = Portfolio::new(config.initial_capital);
    let last = bars.len() - 1;

    for (i, bar) in bars.iter().enumerate() {
        let ctx = BarContext {
            index: i,
            date: bar.date,
            close: bar.close,
            volume_multiplier: volume_multiplier(bars, i, config),
            last_bar: i == last,
        };
        let signal = by_bar[i]
            .copied()
            .unwrap_or_else(|| Signal::hold(i, bar.date));

        let position = std::mem::take(&mut portfolio.position);
        let step = transition(position, portfolio.cash, &signal, &ctx, config);
        portfolio.position = step.position;
        portfolio.cash = step.cash;
        if let Some(trade) = step.closed {
            debug!(
                index = i,
                side = %trade.side,
                reason = %trade.exit_reason,
                pnl = trade.pnl,
                "position closed"
            );
            portfolio.record_trade(trade);
        }
        if let Some(missed) = step.missed {
            warn!(
                index = missed.index,
                side = %missed.side,
                reason = ?missed.reason,
                "entry skipped"
            );
            portfolio.record_missed(missed);
        }

        if i == last {
            let position = std::mem::take(&mut portfolio.position);
            let (cash, closed) =
                close_position(position, portfolio.cash, &ctx, ExitReason::EndOfData, config);
            portfolio.cash = cash;
            if let Some(trade) = closed {
                portfolio.record_trade(trade);
            }
        }

        portfolio.record_equity(bar.date, bar.close);
    }

    Ok(portfolio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Strength;

    fn date(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
    }

    fn ctx(index: usize, close: f64) -> BarContext {
        BarContext {
            index,
            date: date(index),
            close,
            volume_multiplier: 1.0,
            last_bar: false,
        }
    }

    fn signal(index: usize, action: Action) -> Signal {
        Signal {
            index,
            date: date(index),
            action,
            strength: Strength::Moderate,
            confidence: None,
        }
    }

    fn frictionless() -> ExecutionConfig {
        ExecutionConfig {
            commission_pct: 0.0,
            commission_fixed: 0.0,
            slippage_pct: 0.0,
            ..Default::default()
        }
    }

    fn series(closes: &[f64]) -> BarSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                date: date(i),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1000.0,
            })
            .collect();
        BarSeries::new("TEST", bars).unwrap()
    }

    #[test]
    fn commission_takes_larger_of_fixed_and_pct() {
        let config = ExecutionConfig {
            commission_fixed: 5.0,
            commission_pct: 0.1,
            ..Default::default()
        };
        assert!((calculate_commission(1_000.0, &config) - 5.0).abs() < f64::EPSILON);
        assert!((calculate_commission(10_000.0, &config) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn slippage_moves_against_trader() {
        let config = ExecutionConfig {
            slippage_pct: 0.1,
            ..Default::default()
        };
        let c = ctx(0, 100.0);
        assert!((slipped_price(100.0, true, &c, &config) - 100.1).abs() < 1e-9);
        assert!((slipped_price(100.0, false, &c, &config) - 99.9).abs() < 1e-9);
    }

    #[test]
    fn slippage_scales_with_volume_multiplier() {
        let config = ExecutionConfig {
            slippage_pct: 0.1,
            commission_fixed: 0.0,
            commission_pct: 0.0,
            ..Default::default()
        };
        let c = BarContext {
            volume_multiplier: 2.5,
            ..ctx(0, 100.0)
        };
        let f = fill(10, true, &c, &config);
        assert!((f.price - 100.25).abs() < 1e-9);
        assert!((f.slippage - 2.5).abs() < 1e-9);
        assert_eq!(f.commission, 0.0);
    }

    #[test]
    fn volume_multiplier_spike() {
        let s = series(&[100.0; 6]);
        let mut bars = s.bars().to_vec();
        bars[5].volume = 8000.0;
        let config = ExecutionConfig {
            volume_lookback: 5,
            ..Default::default()
        };
        // 8x average / 2.0 spike ratio = 4, clamped to 3
        assert!((volume_multiplier(&bars, 5, &config) - 3.0).abs() < 1e-12);
        bars[5].volume = 5000.0;
        assert!((volume_multiplier(&bars, 5, &config) - 2.5).abs() < 1e-12);
        bars[5].volume = 1500.0;
        assert!((volume_multiplier(&bars, 5, &config) - 1.0).abs() < 1e-12);
        assert_eq!(volume_multiplier(&bars, 0, &config), 1.0);
    }

    #[test]
    fn volume_multiplier_zero_history() {
        let s = series(&[100.0, 100.0]);
        let mut bars = s.bars().to_vec();
        bars[0].volume = 0.0;
        assert_eq!(volume_multiplier(&bars, 1, &ExecutionConfig::default()), 1.0);
    }

    #[test]
    fn entry_notional_capped_by_exposure() {
        let config = ExecutionConfig {
            position_size_pct: 10.0,
            max_exposure_pct: 25.0,
            ..Default::default()
        };
        assert!((entry_notional(100_000.0, 0.0, &config) - 10_000.0).abs() < 1e-9);
        assert!((entry_notional(100_000.0, 20.0, &config) - 5_000.0).abs() < 1e-9);
        assert!(entry_notional(100_000.0, 25.0, &config) <= 0.0);
    }

    #[test]
    fn open_long_sizes_whole_units() {
        let config = frictionless();
        let (pos, cash) = open_position(Side::Long, 100_000.0, &ctx(0, 30.0), &config).unwrap();
        let open = pos.open().unwrap();
        // 10% of 100k at 30 -> 333 units
        assert_eq!(open.size, 333);
        assert!((cash - (100_000.0 - 333.0 * 30.0)).abs() < 1e-9);
        assert!((open.stop_loss - 28.5).abs() < 1e-9);
        assert!((open.take_profit - 33.0).abs() < 1e-9);
    }

    #[test]
    fn open_short_levels_are_inverted() {
        let config = frictionless();
        let (pos, _) = open_position(Side::Short, 100_000.0, &ctx(0, 100.0), &config).unwrap();
        let open = pos.open().unwrap();
        assert!(matches!(pos, Position::Short(_)));
        assert!((open.stop_loss - 105.0).abs() < 1e-9);
        assert!((open.take_profit - 90.0).abs() < 1e-9);
    }

    #[test]
    fn open_skipped_without_exposure_headroom() {
        let config = ExecutionConfig {
            max_exposure_pct: 0.0,
            ..frictionless()
        };
        let missed = open_position(Side::Long, 100_000.0, &ctx(4, 100.0), &config).unwrap_err();
        assert_eq!(missed.reason, SkipReason::Exposure);
        assert_eq!(missed.index, 4);
    }

    #[test]
    fn open_skipped_when_unit_unaffordable() {
        let config = frictionless();
        let missed = open_position(Side::Long, 500.0, &ctx(0, 100.0), &config).unwrap_err();
        assert_eq!(missed.reason, SkipReason::Capital);
    }

    #[test]
    fn open_skipped_when_commission_exceeds_cash() {
        let config = ExecutionConfig {
            position_size_pct: 100.0,
            max_exposure_pct: 100.0,
            commission_fixed: 50.0,
            ..frictionless()
        };
        let missed = open_position(Side::Long, 1_000.0, &ctx(0, 100.0), &config).unwrap_err();
        assert_eq!(missed.reason, SkipReason::Capital);
    }

    #[test]
    fn close_long_books_net_pnl_and_costs() {
        let config = ExecutionConfig {
            commission_fixed: 1.0,
            commission_pct: 0.0,
            slippage_pct: 0.1,
            ..Default::default()
        };
        let (pos, cash) = open_position(Side::Long, 100_000.0, &ctx(0, 100.0), &config).unwrap();
        let (cash, trade) = close_position(pos, cash, &ctx(3, 110.0), ExitReason::Signal, &config);
        let trade = trade.unwrap();

        assert_eq!(trade.exit_reason, ExitReason::Signal);
        assert_eq!(trade.bars_held(), 3);
        // gross move at reference prices: size * 10
        assert!((trade.gross_pnl - trade.size as f64 * 10.0).abs() < 1e-6);
        assert!((trade.gross_pnl - trade.costs - trade.pnl).abs() < 1e-9);
        assert!(trade.costs > 2.0);
        assert!((cash - (100_000.0 + trade.pnl)).abs() < 1e-6);
    }

    #[test]
    fn close_short_returns_escrow() {
        let config = frictionless();
        let (pos, cash) = open_position(Side::Short, 100_000.0, &ctx(0, 100.0), &config).unwrap();
        let size = pos.open().unwrap().size as f64;
        let (cash, trade) = close_position(pos, cash, &ctx(1, 90.0), ExitReason::Signal, &config);
        let trade = trade.unwrap();
        assert!((trade.pnl - size * 10.0).abs() < 1e-9);
        assert!((trade.pnl_pct - 10.0).abs() < 1e-9);
        assert!((cash - (100_000.0 + size * 10.0)).abs() < 1e-6);
    }

    #[test]
    fn close_flat_is_noop() {
        let (cash, trade) =
            close_position(Position::Flat, 10.0, &ctx(0, 1.0), ExitReason::Signal, &frictionless());
        assert_eq!(cash, 10.0);
        assert!(trade.is_none());
    }

    #[test]
    fn stop_loss_takes_precedence_over_signal() {
        let config = frictionless();
        let (pos, cash) = open_position(Side::Long, 100_000.0, &ctx(0, 100.0), &config).unwrap();
        let step = transition(pos, cash, &signal(1, Action::Sell), &ctx(1, 94.0), &config);
        assert!(step.position.is_flat());
        let trade = step.closed.unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert!((trade.pnl_pct + 6.0).abs() < 1e-9);
    }

    #[test]
    fn take_profit_fires() {
        let config = frictionless();
        let (pos, cash) = open_position(Side::Short, 100_000.0, &ctx(0, 100.0), &config).unwrap();
        let step = transition(pos, cash, &signal(1, Action::Hold), &ctx(1, 89.0), &config);
        assert_eq!(step.closed.unwrap().exit_reason, ExitReason::TakeProfit);
    }

    #[test]
    fn buy_while_short_reverses() {
        let config = frictionless();
        let (pos, cash) = open_position(Side::Short, 100_000.0, &ctx(0, 100.0), &config).unwrap();
        let step = transition(pos, cash, &signal(1, Action::Buy), &ctx(1, 98.0), &config);
        assert_eq!(step.closed.unwrap().exit_reason, ExitReason::Signal);
        assert!(matches!(step.position, Position::Long(_)));
    }

    #[test]
    fn sell_while_long_without_shorting_goes_flat() {
        let config = ExecutionConfig {
            allow_short: false,
            ..frictionless()
        };
        let (pos, cash) = open_position(Side::Long, 100_000.0, &ctx(0, 100.0), &config).unwrap();
        let step = transition(pos, cash, &signal(1, Action::Sell), &ctx(1, 101.0), &config);
        assert!(step.position.is_flat());
        assert!(step.closed.is_some());
        assert!(step.missed.is_none());
    }

    #[test]
    fn sell_while_flat_without_shorting_is_hold() {
        let config = ExecutionConfig {
            allow_short: false,
            ..frictionless()
        };
        let step = transition(Position::Flat, 1_000.0, &signal(0, Action::Sell), &ctx(0, 10.0), &config);
        assert!(step.position.is_flat());
        assert!(step.closed.is_none());
        assert!(step.missed.is_none());
        assert_eq!(step.cash, 1_000.0);
    }

    #[test]
    fn repeated_buy_keeps_position() {
        let config = frictionless();
        let (pos, cash) = open_position(Side::Long, 100_000.0, &ctx(0, 100.0), &config).unwrap();
        let step = transition(pos.clone(), cash, &signal(1, Action::Buy), &ctx(1, 101.0), &config);
        assert_eq!(step.position, pos);
        assert_eq!(step.cash, cash);
    }

    #[test]
    fn simulate_closes_at_end_of_data() {
        let s = series(&[100.0, 101.0, 102.0, 103.0]);
        let signals = vec![signal(1, Action::Buy)];
        let portfolio = simulate(&s, &signals, &frictionless()).unwrap();

        assert!(portfolio.position.is_flat());
        assert_eq!(portfolio.trades.len(), 1);
        let trade = &portfolio.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_eq!(trade.entry_index, 1);
        assert_eq!(trade.exit_index, 3);
        assert_eq!(portfolio.equity_curve.len(), 4);
        let last = portfolio.equity_curve.last().unwrap();
        assert!(last.position.is_none());
        assert_eq!(last.equity, portfolio.cash);
    }

    #[test]
    fn buy_on_final_bar_opens_nothing() {
        let s = series(&[100.0; 5]);
        let portfolio = simulate(&s, &[signal(4, Action::Buy)], &ExecutionConfig::default()).unwrap();
        assert!(portfolio.trades.is_empty());
        assert!(portfolio.missed_orders.is_empty());
        assert_eq!(portfolio.cash, 100_000.0);
        assert!(portfolio.equity_curve.iter().all(|p| p.position.is_none()));
    }

    #[test]
    fn reversal_on_final_bar_only_closes() {
        let s = series(&[100.0, 101.0, 102.0, 103.0]);
        let signals = vec![signal(1, Action::Buy), signal(3, Action::Sell)];
        let portfolio = simulate(&s, &signals, &frictionless()).unwrap();

        assert_eq!(portfolio.trades.len(), 1);
        let trade = &portfolio.trades[0];
        assert_eq!(trade.side, Side::Long);
        assert_eq!(trade.exit_reason, ExitReason::Signal);
        assert_eq!(trade.exit_index, 3);
        assert!(portfolio.position.is_flat());
    }

    #[test]
    fn final_bar_context_blocks_entry() {
        let c = BarContext {
            last_bar: true,
            ..ctx(9, 100.0)
        };
        let step = transition(Position::Flat, 100_000.0, &signal(9, Action::Buy), &c, &frictionless());
        assert!(step.position.is_flat());
        assert!(step.closed.is_none());
        assert!(step.missed.is_none());
        assert_eq!(step.cash, 100_000.0);
    }

    #[test]
    fn simulate_rejects_out_of_range_signal() {
        let s = series(&[100.0, 101.0]);
        let err = simulate(&s, &[signal(5, Action::Buy)], &frictionless()).unwrap_err();
        assert!(matches!(
            err,
            TrendsimError::SignalIndexOutOfRange { index: 5, bars: 2 }
        ));
    }

    #[test]
    fn simulate_records_missed_orders() {
        let s = series(&[100.0, 101.0, 102.0]);
        let config = ExecutionConfig {
            initial_capital: 50.0,
            ..frictionless()
        };
        let portfolio = simulate(&s, &[signal(0, Action::Buy)], &config).unwrap();
        assert!(portfolio.trades.is_empty());
        assert_eq!(portfolio.skipped(SkipReason::Capital), 1);
    }
}
