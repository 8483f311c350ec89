//! Report output port trait.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::domain::indicator::IndicatorRow;
use crate::domain::metrics::PerformanceSummary;

/// Port for persisting a run's ledger and aggregates.
pub trait ReportPort {
    fn write(
        &self,
        name: &str,
        result: &BacktestResult,
        summary: &PerformanceSummary,
        output_dir: &Path,
    ) -> Result<(), BacktestError>;

    fn write_indicators(&self, rows: &[IndicatorRow], output_path: &Path)
        -> Result<(), BacktestError>;
}
