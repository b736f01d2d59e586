//! Shared recurrences for indicator calculations.
//!
//! Every helper writes into an output vector pre-sized to the input length;
//! `None` marks bars where the value is not yet available.

use crate::domain::ohlcv::Bar;

/// True range per bar. The first bar has no previous close, so it uses
/// high - low.
pub fn true_range_series(bars: &[Bar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            bar.high - bar.low
        } else {
            bar.true_range(bars[i - 1].close)
        };
        out.push(tr);
    }
    out
}

/// Simple moving average. First `period - 1` values are `None`.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum / period as f64);
    }
    out
}

/// Wilder smoothing in running-sum form.
///
/// The window starts at `start`. The first smoothed value is the plain sum of
/// `values[start..start + period]`, then `prev * (period - 1) / period + current`.
pub fn wilder_sum(values: &[f64], start: usize, period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < start + period {
        return out;
    }

    let seed_idx = start + period - 1;
    let mut smoothed: f64 = values[start..=seed_idx].iter().sum();
    out[seed_idx] = Some(smoothed);

    let n = period as f64;
    for i in (seed_idx + 1)..values.len() {
        smoothed = smoothed * (n - 1.0) / n + values[i];
        out[i] = Some(smoothed);
    }
    out
}

/// Wilder smoothing in averaged form over a sparse series.
///
/// The seed is the mean of the first `period` defined values; afterwards
/// `prev * (period - 1) / period + current / period`. An undefined input after
/// the seed leaves the smoothed value unchanged.
pub fn wilder_average(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }

    let n = period as f64;
    let mut seen = 0usize;
    let mut sum = 0.0;
    let mut smoothed: Option<f64> = None;

    for (i, value) in values.iter().enumerate() {
        match (smoothed, value) {
            (None, Some(v)) => {
                seen += 1;
                sum += v;
                if seen == period {
                    smoothed = Some(sum / n);
                }
            }
            (Some(prev), Some(v)) => {
                smoothed = Some(prev * (n - 1.0) / n + v / n);
            }
            (_, None) => {}
        }
        out[i] = smoothed;
    }
    out
}

/// Count of `None` entries and the index of the first `Some`.
pub fn warmup_extent<T>(values: &[Option<T>]) -> (usize, Option<usize>) {
    let undefined = values.iter().filter(|v| v.is_none()).count();
    let first = values.iter().position(|v| v.is_some());
    (undefined, first)
}
