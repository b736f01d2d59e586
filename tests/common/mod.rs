#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
pub use trendsim::domain::ohlcv::{Bar, BarSeries};
use trendsim::domain::error::TrendsimError;
use trendsim::domain::execution::ExecutionConfig;
use trendsim::domain::signal::ExternalSignal;
use trendsim::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub signals: HashMap<String, Vec<(NaiveDate, ExternalSignal)>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            signals: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_signals(mut self, symbol: &str, signals: Vec<(NaiveDate, ExternalSignal)>) -> Self {
        self.signals.insert(symbol.to_string(), signals);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<BarSeries, TrendsimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TrendsimError::Data {
                reason: reason.clone(),
            });
        }
        BarSeries::new(symbol, self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendsimError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn fetch_external_signals(
        &self,
        symbol: &str,
        _column: usize,
    ) -> Result<Option<Vec<(NaiveDate, ExternalSignal)>>, TrendsimError> {
        Ok(self.signals.get(symbol).cloned())
    }
}

pub fn date(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
}

pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        date: date(i),
        open,
        high,
        low,
        close,
        volume: 10_000.0,
    }
}

/// Bars whose close follows `closes`, with a range of `spread` either side.
pub fn bars_from_closes(closes: &[f64], spread: f64) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let open = if i == 0 { c } else { closes[i - 1] };
            make_bar(
                i,
                open,
                c.max(open) + spread,
                (c.min(open) - spread).max(0.0),
                c,
            )
        })
        .collect()
}

pub fn series_from_closes(symbol: &str, closes: &[f64], spread: f64) -> BarSeries {
    BarSeries::new(symbol, bars_from_closes(closes, spread)).unwrap()
}

pub fn linear_closes(count: usize, start: f64, step: f64) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Rises for `leg` bars, falls for `leg`, and repeats.
pub fn zigzag_closes(count: usize, start: f64, step: f64, leg: usize) -> Vec<f64> {
    let mut price = start;
    (0..count)
        .map(|i| {
            if i > 0 {
                if (i / leg) % 2 == 0 {
                    price += step;
                } else {
                    price -= step;
                }
            }
            price
        })
        .collect()
}

pub fn flat_bars(count: usize, price: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| make_bar(i, price, price, price, price))
        .collect()
}

pub fn frictionless() -> ExecutionConfig {
    ExecutionConfig {
        commission_pct: 0.0,
        commission_fixed: 0.0,
        slippage_pct: 0.0,
        ..Default::default()
    }
}
