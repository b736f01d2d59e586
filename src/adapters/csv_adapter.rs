//! CSV file data adapter.
//!
//! Layout of the data directory:
//! - `<SYMBOL>.csv`: `date,open,high,low,close,volume`, one row per bar
//! - `<SYMBOL>_signals.csv` (optional): `date,<p1>,<p2>,...` bullish probabilities

use crate::domain::error::TrendsimError;
use crate::domain::ohlcv::{Bar, BarSeries};
use crate::domain::signal::ExternalSignal;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const SIGNALS_SUFFIX: &str = "_signals.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn bars_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn signals_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}{}", symbol, SIGNALS_SUFFIX))
    }

    fn read(path: &PathBuf) -> Result<String, TrendsimError> {
        fs::read_to_string(path).map_err(|e| TrendsimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })
    }
}

fn field<T: FromStr>(record: &csv::StringRecord, index: usize, name: &str) -> Result<T, TrendsimError>
where
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| TrendsimError::Data {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| TrendsimError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

fn date_field(record: &csv::StringRecord) -> Result<NaiveDate, TrendsimError> {
    let raw: String = field(record, 0, "date")?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| TrendsimError::Data {
        reason: format!("invalid date format: {}", e),
    })
}

fn parse_error(e: csv::Error) -> TrendsimError {
    TrendsimError::Data {
        reason: format!("CSV parse error: {}", e),
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<BarSeries, TrendsimError> {
        let content = Self::read(&self.bars_path(symbol))?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(parse_error)?;
            bars.push(Bar {
                date: date_field(&record)?,
                open: field(&record, 1, "open")?,
                high: field(&record, 2, "high")?,
                low: field(&record, 3, "low")?,
                close: field(&record, 4, "close")?,
                volume: field(&record, 5, "volume")?,
            });
        }

        BarSeries::new(symbol, bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TrendsimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TrendsimError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TrendsimError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(SIGNALS_SUFFIX) {
                continue;
            }
            if let Some(symbol) = name.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn fetch_external_signals(
        &self,
        symbol: &str,
        column: usize,
    ) -> Result<Option<Vec<(NaiveDate, ExternalSignal)>>, TrendsimError> {
        let path = self.signals_path(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let content = Self::read(&path)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());

        let columns = rdr.headers().map_err(parse_error)?.len();
        if column == 0 || column >= columns {
            return Err(TrendsimError::SignalColumnOutOfRange { column, columns });
        }

        let mut out = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(parse_error)?;
            let date = date_field(&record)?;
            let p: f64 = field(&record, column, "probability")?;
            if !(0.0..=1.0).contains(&p) {
                return Err(TrendsimError::Data {
                    reason: format!("probability {} on {} outside [0, 1]", p, date),
                });
            }
            out.push((
                date,
                ExternalSignal {
                    bullish_probability: p,
                },
            ));
        }
        Ok(Some(out))
    }
}
