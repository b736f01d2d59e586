//! OHLCV bar representation and the validated bar series.

use chrono::NaiveDate;

use super::error::TrendsimError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// (high + low) / 2
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    fn check(&self, index: usize) -> Result<(), TrendsimError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(TrendsimError::InvalidBar {
                    index,
                    reason: format!("{name} is not finite"),
                });
            }
            if value < 0.0 {
                return Err(TrendsimError::InvalidBar {
                    index,
                    reason: format!("{name} is negative"),
                });
            }
        }
        if self.high < self.low {
            return Err(TrendsimError::InvalidBar {
                index,
                reason: "high below low".into(),
            });
        }
        if self.high < self.open.max(self.close) {
            return Err(TrendsimError::InvalidBar {
                index,
                reason: "high below open/close".into(),
            });
        }
        if self.low > self.open.min(self.close) {
            return Err(TrendsimError::InvalidBar {
                index,
                reason: "low above open/close".into(),
            });
        }
        Ok(())
    }
}

/// A time-ordered, validated bar sequence for one instrument.
///
/// Only constructible through [`BarSeries::new`], so every consumer can rely
/// on strictly increasing dates and consistent OHLC values.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, TrendsimError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(TrendsimError::NoData { symbol });
        }
        for (i, bar) in bars.iter().enumerate() {
            bar.check(i)?;
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(TrendsimError::NonMonotonicDate { index: i });
            }
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> &Bar {
        &self.bars[0]
    }

    pub fn last(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    /// Errors when the series is shorter than `minimum` bars.
    pub fn require_len(&self, minimum: usize) -> Result<(), TrendsimError> {
        if self.bars.len() < minimum {
            return Err(TrendsimError::InsufficientData {
                symbol: self.symbol.clone(),
                bars: self.bars.len(),
                minimum,
            });
        }
        Ok(())
    }
}
