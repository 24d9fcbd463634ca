//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for seer.
#[derive(Debug, thiserror::Error)]
pub enum SeerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("duplicate date {date} in {table}")]
    DuplicateDate { table: String, date: NaiveDate },

    #[error("dates in {table} are not increasing at {date}")]
    UnsortedIndex { table: String, date: NaiveDate },

    #[error("cannot align {table}: {missing} of its dates are not on the target axis (first {first})")]
    IndexMismatch {
        table: String,
        missing: usize,
        first: NaiveDate,
    },

    #[error("shape mismatch in {table}: {reason}")]
    Shape { table: String, reason: String },

    #[error("column {column} not found in {table}")]
    MissingColumn { table: String, column: String },

    #[error("no tradable asset has usable price data")]
    NoTradableAssets,

    #[error("benchmark {ticker} is not present in the price table")]
    BenchmarkMissing { ticker: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SeerError> for std::process::ExitCode {
    fn from(err: &SeerError) -> Self {
        let code: u8 = match err {
            SeerError::Io(_) | SeerError::Csv(_) => 1,
            SeerError::ConfigParse { .. }
            | SeerError::ConfigMissing { .. }
            | SeerError::ConfigInvalid { .. } => 2,
            SeerError::Data { .. }
            | SeerError::DuplicateDate { .. }
            | SeerError::UnsortedIndex { .. }
            | SeerError::IndexMismatch { .. }
            | SeerError::Shape { .. }
            | SeerError::MissingColumn { .. } => 3,
            SeerError::NoTradableAssets | SeerError::BenchmarkMissing { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
