//! Signal Generator: maps one indicator frame to one discrete action.
//!
//! Precedence:
//! 1. SuperTrend direction is the primary trend; undefined trend or ADX is Hold.
//! 2. ADX above `adx_threshold` follows the trend (Moderate, Strong when
//!    ADX is above `adx_strong_threshold` and the DI balance agrees).
//! 3. At or below the threshold, a directional balance beyond `momentum_extreme`
//!    issues a contrarian Weak signal; a balance agreeing with the trend issues a
//!    Weak trend signal; anything else is Hold.
//! 4. An external bullish probability, when supplied, sets the confidence and
//!    can veto or upgrade the signal.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::error::TrendsimError;
use crate::domain::indicator::{IndicatorFrame, Trend};
use crate::domain::ohlcv::BarSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strength {
    Weak,
    Moderate,
    Strong,
}

impl Strength {
    fn upgraded(self) -> Self {
        match self {
            Strength::Weak => Strength::Moderate,
            Strength::Moderate | Strength::Strong => Strength::Strong,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub index: usize,
    pub date: NaiveDate,
    pub action: Action,
    pub strength: Strength,
    pub confidence: Option<f64>,
}

impl Signal {
    pub fn hold(index: usize, date: NaiveDate) -> Self {
        Signal {
            index,
            date,
            action: Action::Hold,
            strength: Strength::Weak,
            confidence: None,
        }
    }
}

/// Externally supplied model output for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExternalSignal {
    /// Probability in [0, 1] that the next move is up.
    pub bullish_probability: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub adx_threshold: f64,
    pub adx_strong_threshold: f64,
    pub momentum_extreme: f64,
    pub external_veto: f64,
    pub external_confirm: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            adx_threshold: 25.0,
            adx_strong_threshold: 40.0,
            momentum_extreme: 0.6,
            external_veto: 0.35,
            external_confirm: 0.65,
        }
    }
}

fn action_for(trend: Trend) -> Action {
    match trend {
        Trend::Up => Action::Buy,
        Trend::Down => Action::Sell,
    }
}

fn agrees(balance: f64, trend: Trend) -> bool {
    match trend {
        Trend::Up => balance > 0.0,
        Trend::Down => balance < 0.0,
    }
}

pub fn generate_signal(
    index: usize,
    frame: &IndicatorFrame,
    config: &SignalConfig,
    external: Option<ExternalSignal>,
) -> Signal {
    let hold = Signal::hold(index, frame.date);

    let (Some(trend), Some(adx)) = (frame.supertrend_direction, frame.adx) else {
        return hold;
    };
    let balance = frame.directional_balance().unwrap_or(0.0);

    let (action, strength) = if adx > config.adx_threshold {
        let strength = if adx > config.adx_strong_threshold && agrees(balance, trend) {
            Strength::Strong
        } else {
            Strength::Moderate
        };
        (action_for(trend), strength)
    } else if balance >= config.momentum_extreme {
        (Action::Sell, Strength::Weak)
    } else if balance <= -config.momentum_extreme {
        (Action::Buy, Strength::Weak)
    } else if agrees(balance, trend) {
        (action_for(trend), Strength::Weak)
    } else {
        return hold;
    };

    let Some(ext) = external else {
        return Signal {
            action,
            strength,
            ..hold
        };
    };

    let p = ext.bullish_probability.clamp(0.0, 1.0);
    let aligned = match action {
        Action::Buy => p,
        Action::Sell => 1.0 - p,
        Action::Hold => return hold,
    };
    if aligned < config.external_veto {
        return Signal {
            confidence: Some(aligned),
            ..hold
        };
    }
    let strength = if aligned >= config.external_confirm {
        strength.upgraded()
    } else {
        strength
    };

    Signal {
        action,
        strength,
        confidence: Some(aligned),
        ..hold
    }
}

/// One signal per frame. `external`, when given, must have one entry per frame.
pub fn generate_signals(
    frames: &[IndicatorFrame],
    config: &SignalConfig,
    external: Option<&[Option<ExternalSignal>]>,
) -> Result<Vec<Signal>, TrendsimError> {
    if let Some(ext) = external {
        if ext.len() != frames.len() {
            return Err(TrendsimError::SignalLengthMismatch {
                signals: ext.len(),
                bars: frames.len(),
            });
        }
    }

    Ok(frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let ext = external.and_then(|e| e[i]);
            generate_signal(i, frame, config, ext)
        })
        .collect())
}

/// Place dated external signals on the bars they share a date with. Dates
/// with no matching bar are dropped; a later entry for the same date wins.
pub fn align_external(
    series: &BarSeries,
    dated: &[(NaiveDate, ExternalSignal)],
) -> Vec<Option<ExternalSignal>> {
    let bars = series.bars();
    let mut out = vec![None; bars.len()];
    for (date, signal) in dated {
        if let Ok(i) = bars.binary_search_by_key(date, |b| b.date) {
            out[i] = Some(*signal);
        }
    }
    out
}
