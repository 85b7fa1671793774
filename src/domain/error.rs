//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for stockscreen.
#[derive(Debug, thiserror::Error)]
pub enum StockscreenError {
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

    #[error("unknown strategy: {id}")]
    UnknownStrategy { id: String },

    #[error("invalid period for {indicator}: {period}")]
    InvalidPeriod { indicator: String, period: usize },

    #[error("no data for {code} on {market}")]
    NoData { code: String, market: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("malformed bar for {code} on {date}: {reason}")]
    MalformedBar {
        code: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("missing field {field} for {code}")]
    StrategyFieldMissing { code: String, field: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StockscreenError> for std::process::ExitCode {
    fn from(err: &StockscreenError) -> Self {
        let code: u8 = match err {
            StockscreenError::Io(_) => 1,
            StockscreenError::ConfigParse { .. }
            | StockscreenError::ConfigMissing { .. }
            | StockscreenError::ConfigInvalid { .. } => 2,
            StockscreenError::DataSource { .. } => 3,
            StockscreenError::UnknownStrategy { .. } | StockscreenError::InvalidPeriod { .. } => 4,
            StockscreenError::NoData { .. }
            | StockscreenError::InsufficientData { .. }
            | StockscreenError::MalformedBar { .. }
            | StockscreenError::StrategyFieldMissing { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
