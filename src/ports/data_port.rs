//! Data access port trait.

use crate::domain::error::TrendsimError;
use crate::domain::ohlcv::BarSeries;
use crate::domain::signal::ExternalSignal;
use chrono::NaiveDate;

pub trait DataPort {
    /// Validated bar series for `symbol`, oldest first.
    fn fetch_bars(&self, symbol: &str) -> Result<BarSeries, TrendsimError>;

    fn list_symbols(&self) -> Result<Vec<String>, TrendsimError>;

    /// Dated bullish probabilities read from `column` of the symbol's signal
    /// table. `Ok(None)` when the symbol has no signal table.
    fn fetch_external_signals(
        &self,
        symbol: &str,
        column: usize,
    ) -> Result<Option<Vec<(NaiveDate, ExternalSignal)>>, TrendsimError>;
}
