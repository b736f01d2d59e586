//! Position state and the closed-trade record.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "SIGNAL"),
            ExitReason::StopLoss => write!(f, "STOP_LOSS"),
            ExitReason::TakeProfit => write!(f, "TAKE_PROFIT"),
            ExitReason::EndOfData => write!(f, "END_OF_DATA"),
        }
    }
}

/// An open leg. Prices are fill prices (slippage included).
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    pub entry_index: usize,
    pub entry_price: f64,
    pub size: u64,
    /// 0.0 disables the stop.
    pub stop_loss: f64,
    /// 0.0 disables the target.
    pub take_profit: f64,
    pub entry_commission: f64,
    pub entry_slippage: f64,
}

impl OpenPosition {
    pub fn entry_notional(&self) -> f64 {
        self.size as f64 * self.entry_price
    }

    pub fn entry_costs(&self) -> f64 {
        self.entry_commission + self.entry_slippage
    }
}

/// Simulation position state. Owned by the execution engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long(OpenPosition),
    Short(OpenPosition),
}

impl Position {
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            Position::Flat => None,
            Position::Long(_) => Some(Side::Long),
            Position::Short(_) => Some(Side::Short),
        }
    }

    pub fn open(&self) -> Option<&OpenPosition> {
        match self {
            Position::Flat => None,
            Position::Long(p) | Position::Short(p) => Some(p),
        }
    }

    /// Value of the position at `price`. A short escrows its entry notional,
    /// so it is worth `size * (2 * entry - price)`.
    pub fn market_value(&self, price: f64) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Long(p) => p.size as f64 * price,
            Position::Short(p) => p.size as f64 * (2.0 * p.entry_price - price),
        }
    }

    /// Price P&L at `price`, before exit costs.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Long(p) => p.size as f64 * (price - p.entry_price),
            Position::Short(p) => p.size as f64 * (p.entry_price - price),
        }
    }

    /// Unrealized P&L as a percentage of entry notional.
    pub fn unrealized_pnl_pct(&self, price: f64) -> f64 {
        match self.open() {
            Some(p) if p.entry_notional() > 0.0 => {
                self.unrealized_pnl(price) / p.entry_notional() * 100.0
            }
            _ => 0.0,
        }
    }

    /// Unrealized loss at `price` has reached `stop_loss_pct`. 0 disables.
    pub fn should_stop_loss(&self, price: f64, stop_loss_pct: f64) -> bool {
        stop_loss_pct > 0.0 && !self.is_flat() && self.unrealized_pnl_pct(price) <= -stop_loss_pct
    }

    /// Unrealized gain at `price` has reached `take_profit_pct`. 0 disables.
    pub fn should_take_profit(&self, price: f64, take_profit_pct: f64) -> bool {
        take_profit_pct > 0.0 && !self.is_flat() && self.unrealized_pnl_pct(price) >= take_profit_pct
    }
}

/// Point-in-time copy of the open position carried on each equity point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSnapshot {
    pub side: Side,
    pub size: u64,
    pub entry_price: f64,
    pub market_value: f64,
}

impl PositionSnapshot {
    pub fn of(position: &Position, price: f64) -> Option<Self> {
        let side = position.side()?;
        let open = position.open()?;
        Some(PositionSnapshot {
            side,
            size: open.size,
            entry_price: open.entry_price,
            market_value: position.market_value(price),
        })
    }
}

/// A closed round trip. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub side: Side,
    pub size: u64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Net of every cost.
    pub pnl: f64,
    /// `pnl` relative to entry notional, in percent.
    pub pnl_pct: f64,
    /// P&L at the unslipped reference prices, before any cost.
    pub gross_pnl: f64,
    /// Commissions and slippage of both fills.
    pub costs: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn bars_held(&self) -> usize {
        self.exit_index - self.entry_index
    }
}
