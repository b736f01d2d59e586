//! Multi-symbol screening. Each symbol is an independent run; runs execute
//! in parallel and results come back in input order.

use rayon::prelude::*;
use tracing::warn;

use super::backtest::{BacktestConfig, BacktestResult, run_backtest};
use super::error::TrendsimError;
use super::ohlcv::BarSeries;
use super::signal::ExternalSignal;

#[derive(Debug, Clone)]
pub struct ScreenInput {
    pub series: BarSeries,
    pub external: Option<Vec<Option<ExternalSignal>>>,
}

impl ScreenInput {
    pub fn new(series: BarSeries) -> Self {
        ScreenInput {
            series,
            external: None,
        }
    }
}

#[derive(Debug)]
pub struct ScreenOutcome {
    pub symbol: String,
    pub result: Result<BacktestResult, TrendsimError>,
}

/// Run one symbol, rejecting series shorter than the longest lookback.
pub fn run_checked(
    input: &ScreenInput,
    config: &BacktestConfig,
) -> Result<BacktestResult, TrendsimError> {
    input
        .series
        .require_len(config.indicators.longest_lookback())?;
    run_backtest(&input.series, input.external.as_deref(), config)
}

pub fn screen(inputs: &[ScreenInput], config: &BacktestConfig) -> Vec<ScreenOutcome> {
    inputs
        .par_iter()
        .map(|input| {
            let result = run_checked(input, config);
            if let Err(e) = &result {
                warn!(symbol = input.series.symbol(), error = %e, "symbol skipped");
            }
            ScreenOutcome {
                symbol: input.series.symbol().to_string(),
                result,
            }
        })
        .collect()
}

/// Successful outcomes ordered by total return, best first.
pub fn rank_by_return(outcomes: &[ScreenOutcome]) -> Vec<&BacktestResult> {
    let mut ranked: Vec<&BacktestResult> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
        .collect();
    ranked.sort_by(|a, b| {
        b.metrics
            .total_return_pct
            .total_cmp(&a.metrics.total_return_pct)
    });
    ranked
}
