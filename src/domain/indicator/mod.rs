//! Indicator Engine.
//!
//! Computes one [`IndicatorFrame`] per bar from a [`BarSeries`]:
//! - ATR (simple average of true range)
//! - SuperTrend band and direction
//! - ADX with +DI/-DI (Wilder smoothing)
//! - Parabolic SAR value and direction
//!
//! Fields that are still warming up are `None`. When the series is shorter
//! than the longest lookback, every field of every frame is `None`.

pub mod adx;
pub mod atr;
pub mod psar;
pub mod supertrend;

use chrono::NaiveDate;
use std::fmt;

use crate::domain::indicator_helpers::warmup_extent;
use crate::domain::ohlcv::BarSeries;
use adx::calculate_adx;
use atr::calculate_atr;
use psar::{PsarParams, calculate_psar};
use supertrend::calculate_supertrend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trend {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub atr_period: usize,
    pub supertrend_multiplier: f64,
    pub adx_period: usize,
    pub psar: PsarParams,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            atr_period: 14,
            supertrend_multiplier: 3.0,
            adx_period: 14,
            psar: PsarParams::default(),
        }
    }
}

impl IndicatorConfig {
    /// Bars needed before every indicator can produce a value.
    pub fn longest_lookback(&self) -> usize {
        self.atr_period.max(2 * self.adx_period).max(2)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorType {
    Atr(usize),
    SuperTrend { period: usize, multiplier: f64 },
    DirectionalIndex(usize),
    Adx(usize),
    Psar(PsarParams),
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::SuperTrend { period, multiplier } => {
                write!(f, "SUPERTREND({},{})", period, multiplier)
            }
            IndicatorType::DirectionalIndex(period) => write!(f, "DI({})", period),
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::Psar(p) => {
                write!(f, "PSAR({},{},{})", p.af_start, p.af_increment, p.af_max)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub date: NaiveDate,
    pub atr: Option<f64>,
    pub supertrend: Option<f64>,
    pub supertrend_direction: Option<Trend>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub psar: Option<f64>,
    pub psar_direction: Option<Trend>,
}

impl IndicatorFrame {
    pub fn undefined(date: NaiveDate) -> Self {
        IndicatorFrame {
            date,
            atr: None,
            supertrend: None,
            supertrend_direction: None,
            adx: None,
            plus_di: None,
            minus_di: None,
            psar: None,
            psar_direction: None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.atr.is_none()
            && self.supertrend.is_none()
            && self.adx.is_none()
            && self.plus_di.is_none()
            && self.minus_di.is_none()
            && self.psar.is_none()
    }

    /// (+DI - -DI) / (+DI + -DI), `None` when undefined or both sides are zero.
    pub fn directional_balance(&self) -> Option<f64> {
        adx::DirectionalPoint {
            adx: self.adx,
            plus_di: self.plus_di,
            minus_di: self.minus_di,
        }
        .balance()
    }
}

/// Per-indicator warm-up disclosure.
#[derive(Debug, Clone, PartialEq)]
pub struct WarmupReport {
    pub indicator: IndicatorType,
    pub undefined_bars: usize,
    pub first_defined: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrames {
    pub frames: Vec<IndicatorFrame>,
    pub warmup: Vec<WarmupReport>,
    /// True when the series was shorter than the longest lookback.
    pub insufficient: bool,
}

pub fn compute_frames(series: &BarSeries, config: &IndicatorConfig) -> IndicatorFrames {
    let bars = series.bars();
    let n = bars.len();
    let mut frames: Vec<IndicatorFrame> = bars
        .iter()
        .map(|b| IndicatorFrame::undefined(b.date))
        .collect();

    let insufficient = n < config.longest_lookback();
    if !insufficient {
        let atr = calculate_atr(bars, config.atr_period);
        let st = calculate_supertrend(bars, &atr, config.supertrend_multiplier);
        let dmi = calculate_adx(bars, config.adx_period);
        let sar = calculate_psar(bars, &config.psar);

        for (i, frame) in frames.iter_mut().enumerate() {
            frame.atr = atr[i];
            frame.supertrend = st[i].map(|p| p.value);
            frame.supertrend_direction = st[i].map(|p| p.direction);
            frame.adx = dmi[i].adx;
            frame.plus_di = dmi[i].plus_di;
            frame.minus_di = dmi[i].minus_di;
            frame.psar = sar[i].map(|p| p.value);
            frame.psar_direction = sar[i].map(|p| p.direction);
        }
    }

    let warmup = build_warmup(&frames, config);
    IndicatorFrames {
        frames,
        warmup,
        insufficient,
    }
}

fn build_warmup(frames: &[IndicatorFrame], config: &IndicatorConfig) -> Vec<WarmupReport> {
    let column = |f: fn(&IndicatorFrame) -> Option<f64>| -> Vec<Option<f64>> {
        frames.iter().map(f).collect()
    };
    let entries = [
        (IndicatorType::Atr(config.atr_period), column(|f| f.atr)),
        (
            IndicatorType::SuperTrend {
                period: config.atr_period,
                multiplier: config.supertrend_multiplier,
            },
            column(|f| f.supertrend),
        ),
        (
            IndicatorType::DirectionalIndex(config.adx_period),
            column(|f| f.plus_di),
        ),
        (IndicatorType::Adx(config.adx_period), column(|f| f.adx)),
        (IndicatorType::Psar(config.psar), column(|f| f.psar)),
    ];

    entries
        .into_iter()
        .map(|(indicator, values)| {
            let (undefined_bars, first_defined) = warmup_extent(&values);
            WarmupReport {
                indicator,
                undefined_bars,
                first_defined,
            }
        })
        .collect()
}
