//! SuperTrend: ATR bands that ratchet in the trend's favour.
//!
//! basic_upper = hl2 + m * ATR, basic_lower = hl2 - m * ATR.
//! While up, the lower band only rises: lower = max(basic_lower, prev_lower).
//! While down, the upper band only falls: upper = min(basic_upper, prev_upper).
//! Up flips to down when close <= prev_lower; down flips to up when
//! close >= prev_upper. A flip restarts the newly active band from its basic
//! value. The emitted value is the active band.
//!
//! Seeded in an uptrend at the first bar where ATR is defined.

use super::Trend;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuperTrendPoint {
    pub value: f64,
    pub direction: Trend,
}

pub fn calculate_supertrend(
    bars: &[Bar],
    atr: &[Option<f64>],
    multiplier: f64,
) -> Vec<Option<SuperTrendPoint>> {
    let mut out = vec![None; bars.len()];

    let start = match atr.iter().position(|v| v.is_some()) {
        Some(idx) if idx < bars.len() => idx,
        _ => return out,
    };

    let bands = |i: usize, atr: f64| {
        let mid = bars[i].midpoint();
        (mid + multiplier * atr, mid - multiplier * atr)
    };

    let Some(seed_atr) = atr[start] else {
        return out;
    };
    let (mut upper, mut lower) = bands(start, seed_atr);
    let mut direction = Trend::Up;
    out[start] = Some(SuperTrendPoint {
        value: lower,
        direction,
    });

    for i in (start + 1)..bars.len() {
        let Some(atr_i) = atr[i] else {
            continue;
        };
        let (basic_upper, basic_lower) = bands(i, atr_i);
        let close = bars[i].close;

        match direction {
            Trend::Up => {
                if close <= lower {
                    direction = Trend::Down;
                    upper = basic_upper;
                } else {
                    lower = basic_lower.max(lower);
                }
            }
            Trend::Down => {
                if close >= upper {
                    direction = Trend::Up;
                    lower = basic_lower;
                } else {
                    upper = basic_upper.min(upper);
                }
            }
        }

        let value = match direction {
            Trend::Up => lower,
            Trend::Down => upper,
        };
        out[i] = Some(SuperTrendPoint { value, direction });
    }

    out
}
