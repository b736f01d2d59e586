//! Average True Range.
//!
//! ATR(n) is the simple moving average of true range over `n` bars.
//! Warmup: first (n-1) bars are undefined.

use crate::domain::indicator_helpers::{rolling_mean, true_range_series};
use crate::domain::ohlcv::Bar;

pub fn calculate_atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    rolling_mean(&true_range_series(bars), period)
}
