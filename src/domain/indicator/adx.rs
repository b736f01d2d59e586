//! ADX with +DI/-DI (Wilder).
//!
//! 1. +DM / -DM from consecutive bars (the larger move wins, negatives are 0)
//! 2. Wilder running-sum smoothing of TR, +DM, -DM (seed = plain sum of n values)
//! 3. +DI = 100 * S(+DM) / S(TR), -DI = 100 * S(-DM) / S(TR)
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI), undefined when the sum is zero
//! 5. ADX = Wilder average of DX
//!
//! DI is defined from bar n, ADX from bar 2n-1 at the earliest.

use crate::domain::indicator_helpers::{true_range_series, wilder_average, wilder_sum};
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DirectionalPoint {
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
}

impl DirectionalPoint {
    /// (+DI - -DI) / (+DI + -DI), in [-1, 1]. `None` when either side is
    /// undefined or both are zero.
    pub fn balance(&self) -> Option<f64> {
        let (plus, minus) = (self.plus_di?, self.minus_di?);
        let sum = plus + minus;
        if sum > 0.0 {
            Some((plus - minus) / sum)
        } else {
            None
        }
    }
}

/// Raw directional movement for bar `i` relative to bar `i - 1`.
pub fn directional_movement(prev: &Bar, bar: &Bar) -> (f64, f64) {
    let up_move = bar.high - prev.high;
    let down_move = prev.low - bar.low;
    let plus = if up_move > down_move && up_move > 0.0 {
        up_move
    } else {
        0.0
    };
    let minus = if down_move > up_move && down_move > 0.0 {
        down_move
    } else {
        0.0
    };
    (plus, minus)
}

pub fn calculate_adx(bars: &[Bar], period: usize) -> Vec<DirectionalPoint> {
    let n = bars.len();
    let mut out = vec![DirectionalPoint::default(); n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let (plus, minus) = directional_movement(&bars[i - 1], &bars[i]);
        plus_dm[i] = plus;
        minus_dm[i] = minus;
    }

    let tr = true_range_series(bars);
    let smooth_tr = wilder_sum(&tr, 1, period);
    let smooth_plus = wilder_sum(&plus_dm, 1, period);
    let smooth_minus = wilder_sum(&minus_dm, 1, period);

    let mut dx: Vec<Option<f64>> = vec![None; n];
    for i in 0..n {
        let (Some(s_tr), Some(s_plus), Some(s_minus)) = (smooth_tr[i], smooth_plus[i], smooth_minus[i])
        else {
            continue;
        };
        if s_tr <= 0.0 {
            continue;
        }

        let plus_di = 100.0 * s_plus / s_tr;
        let minus_di = 100.0 * s_minus / s_tr;
        out[i].plus_di = Some(plus_di);
        out[i].minus_di = Some(minus_di);

        let di_sum = plus_di + minus_di;
        if di_sum > 0.0 {
            dx[i] = Some(100.0 * (plus_di - minus_di).abs() / di_sum);
        }
    }

    for (point, adx) in out.iter_mut().zip(wilder_average(&dx, period)) {
        point.adx = adx;
    }
    out
}
