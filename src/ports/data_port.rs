//! Price series port trait.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

/// Source of ordered bars for one symbol.
pub trait DataPort {
    /// Bars dated within `[start_date, end_date]`, ascending by timestamp.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BacktestError>;
}
