//! Domain error types.

use chrono::NaiveDate;

/// Numeric failure while deriving an indicator value for a single bar.
///
/// The pipeline never propagates these: the bar is skipped so that an
/// undefined value cannot leak into the smoothing recursions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("baseline is zero at close {close}; disparity is undefined")]
    ZeroBaseline { close: f64 },
}

/// Top-level error type for disparity-trader.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
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

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("malformed data: {reason}")]
    DataFormat { reason: String },

    #[error("no data available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("non-finite close {value} at bar {index}")]
    NonFiniteClose { index: usize, value: f64 },

    #[error("cannot open a position at non-positive price {price} on {date}")]
    InvalidEntryPrice { date: NaiveDate, price: f64 },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    /// Whether a provider may succeed if the same request is issued again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BacktestError::DataSource { .. } | BacktestError::Io(_))
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::DataSource { .. }
            | BacktestError::DataFormat { .. }
            | BacktestError::DataUnavailable { .. } => 5,
            BacktestError::NonFiniteClose { .. } | BacktestError::InvalidEntryPrice { .. } => 6,
            BacktestError::Report { .. } => 7,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_source_errors_are_retryable() {
        let err = BacktestError::DataSource {
            reason: "timeout".into(),
        };
        assert!(err.is_retryable());
        let io = BacktestError::Io(std::io::Error::other("reset"));
        assert!(io.is_retryable());
    }

    #[test]
    fn format_and_config_errors_are_not_retryable() {
        let err = BacktestError::DataFormat {
            reason: "bad close".into(),
        };
        assert!(!err.is_retryable());
        let err = BacktestError::ConfigMissing {
            section: "nifty".into(),
            key: "symbol".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn display_includes_context() {
        let err = BacktestError::ConfigInvalid {
            section: "nifty".into(),
            key: "fast_period".into(),
            reason: "must be positive".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [nifty] fast_period: must be positive"
        );

        let err = BacktestError::NonFiniteClose {
            index: 7,
            value: f64::NAN,
        };
        assert_eq!(err.to_string(), "non-finite close NaN at bar 7");
    }

    #[test]
    fn zero_baseline_display() {
        let err = DomainError::ZeroBaseline { close: 0.0 };
        assert_eq!(
            err.to_string(),
            "baseline is zero at close 0; disparity is undefined"
        );
    }
}
