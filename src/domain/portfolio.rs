//! Cash, trade ledger and equity-curve bookkeeping for one simulation run.

use chrono::NaiveDate;

use super::position::{Position, PositionSnapshot, Side, Trade};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
    pub position: Option<PositionSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Exposure cap left no headroom.
    Exposure,
    /// Size rounded to zero or the fill cost exceeded cash.
    Capital,
}

/// An entry that a valid signal asked for but that was not filled.
#[derive(Debug, Clone, PartialEq)]
pub struct MissedOrder {
    pub index: usize,
    pub date: NaiveDate,
    pub side: Side,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub position: Position,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub missed_orders: Vec<MissedOrder>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            position: Position::Flat,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            missed_orders: Vec::new(),
        }
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn record_missed(&mut self, missed: MissedOrder) {
        self.missed_orders.push(missed);
    }

    /// Mark to market at `price`.
    pub fn record_equity(&mut self, date: NaiveDate, price: f64) {
        let position = PositionSnapshot::of(&self.position, price);
        self.equity_curve.push(EquityPoint {
            date,
            equity: self.equity(price),
            cash: self.cash,
            position,
        });
    }

    pub fn total_costs(&self) -> f64 {
        let closed: f64 = self.trades.iter().map(|t| t.costs).sum();
        let open = self.position.open().map(|p| p.entry_costs()).unwrap_or(0.0);
        closed + open
    }

    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.missed_orders
            .iter()
            .filter(|m| m.reason == reason)
            .count()
    }
}
