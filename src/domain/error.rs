//! Domain error types.
//!
//! Only fatal conditions live here. Recoverable conditions (indicator warm-up,
//! guarded divisions, skipped orders) are reported through
//! [`crate::domain::backtest::RunDiagnostics`] instead.

/// Top-level error type for trendsim.
#[derive(Debug, thiserror::Error)]
pub enum TrendsimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error("bar dates must be strictly increasing (index {index})")]
    NonMonotonicDate { index: usize },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("signal index {index} out of range for {bars} bars")]
    SignalIndexOutOfRange { index: usize, bars: usize },

    #[error("external signal length {signals} does not match {bars} bars")]
    SignalLengthMismatch { signals: usize, bars: usize },

    #[error("signal column {column} out of range ({columns} columns)")]
    SignalColumnOutOfRange { column: usize, columns: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrendsimError {
    /// True for the validation family: malformed input that must stop a run
    /// before it starts.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TrendsimError::NoData { .. }
                | TrendsimError::InvalidBar { .. }
                | TrendsimError::NonMonotonicDate { .. }
                | TrendsimError::InsufficientData { .. }
                | TrendsimError::SignalIndexOutOfRange { .. }
                | TrendsimError::SignalLengthMismatch { .. }
                | TrendsimError::SignalColumnOutOfRange { .. }
        )
    }

    /// Process exit status: I/O 1, config 2, data 3, validation 5.
    pub fn exit_code(&self) -> u8 {
        match self {
            TrendsimError::Io(_) => 1,
            TrendsimError::ConfigParse { .. } | TrendsimError::ConfigInvalid { .. } => 2,
            TrendsimError::Data { .. } => 3,
            TrendsimError::NoData { .. }
            | TrendsimError::InvalidBar { .. }
            | TrendsimError::NonMonotonicDate { .. }
            | TrendsimError::InsufficientData { .. }
            | TrendsimError::SignalIndexOutOfRange { .. }
            | TrendsimError::SignalLengthMismatch { .. }
            | TrendsimError::SignalColumnOutOfRange { .. } => 5,
        }
    }
}

impl From<&TrendsimError> for std::process::ExitCode {
    fn from(err: &TrendsimError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}
