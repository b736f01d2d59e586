//! Parabolic SAR (Wilder's stop-and-reverse).
//!
//! Sequential state: direction, extreme point (EP) and acceleration factor
//! (AF). Initial direction comes from the first two closes; the first SAR is
//! emitted at bar 1.

use super::Trend;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsarParams {
    pub af_start: f64,
    pub af_increment: f64,
    pub af_max: f64,
}

impl Default for PsarParams {
    fn default() -> Self {
        PsarParams {
            af_start: 0.02,
            af_increment: 0.02,
            af_max: 0.20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsarPoint {
    pub value: f64,
    pub direction: Trend,
}

pub fn calculate_psar(bars: &[Bar], params: &PsarParams) -> Vec<Option<PsarPoint>> {
    let n = bars.len();
    let mut out = vec![None; n];
    if n < 2 {
        return out;
    }

    let mut direction = if bars[1].close >= bars[0].close {
        Trend::Up
    } else {
        Trend::Down
    };
    let mut af = params.af_start;
    let (mut sar, mut ep) = match direction {
        Trend::Up => (bars[0].low, bars[1].high),
        Trend::Down => (bars[0].high, bars[1].low),
    };
    out[1] = Some(PsarPoint {
        value: sar,
        direction,
    });

    for i in 2..n {
        let bar = &bars[i];
        let mut next = sar + af * (ep - sar);

        match direction {
            Trend::Up => {
                next = next.min(bars[i - 1].low).min(bars[i - 2].low);
                if bar.low < next {
                    direction = Trend::Down;
                    next = ep;
                    ep = bar.low;
                    af = params.af_start;
                } else if bar.high > ep {
                    ep = bar.high;
                    af = (af + params.af_increment).min(params.af_max);
                }
            }
            Trend::Down => {
                next = next.max(bars[i - 1].high).max(bars[i - 2].high);
                if bar.high > next {
                    direction = Trend::Up;
                    next = ep;
                    ep = bar.high;
                    af = params.af_start;
                } else if bar.low < ep {
                    ep = bar.low;
                    af = (af + params.af_increment).min(params.af_max);
                }
            }
        }

        sar = next;
        out[i] = Some(PsarPoint {
            value: sar,
            direction,
        });
    }

    out
}
