//! Domain error types.

/// Top-level error type for levtrader.
#[derive(Debug, thiserror::Error)]
pub enum LevtraderError {
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

    #[error("failed to load price data: {reason}")]
    DataLoad { reason: String },

    #[error("price data is missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for strategy {strategy}: have {bars} bars, need more than {minimum}")]
    InsufficientData {
        strategy: String,
        bars: usize,
        minimum: usize,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LevtraderError {
    /// Process exit status: 1 I/O or report, 2 configuration, 5 data.
    pub fn exit_code(&self) -> u8 {
        match self {
            LevtraderError::Io(_) | LevtraderError::Report { .. } => 1,
            LevtraderError::ConfigParse { .. }
            | LevtraderError::ConfigMissing { .. }
            | LevtraderError::ConfigInvalid { .. } => 2,
            LevtraderError::DataLoad { .. }
            | LevtraderError::MissingColumns { .. }
            | LevtraderError::NoData { .. }
            | LevtraderError::InsufficientData { .. } => 5,
        }
    }
}

impl From<&LevtraderError> for std::process::ExitCode {
    fn from(err: &LevtraderError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}
