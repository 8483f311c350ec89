//! CSV file data adapter.
//!
//! Reads `<base_path>/<symbol>.csv`. Columns are located by header name so
//! exports from different tools load without reshaping.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const TIMESTAMP_COLUMNS: [&str; 3] = ["date", "timestamp", "datetime"];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

struct Columns {
    timestamp: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, BacktestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let timestamp = TIMESTAMP_COLUMNS
            .iter()
            .find_map(|name| find(name))
            .ok_or_else(|| BacktestError::DataFormat {
                reason: "missing date/timestamp column".into(),
            })?;
        let close = find("close").ok_or_else(|| BacktestError::DataFormat {
            reason: "missing close column".into(),
        })?;

        Ok(Columns {
            timestamp,
            open: find("open"),
            high: find("high"),
            low: find("low"),
            close,
        })
    }
}

/// Accepts a bare date (daily bar) or one of the supported datetime forms.
fn parse_timestamp(value: &str) -> Result<(NaiveDate, Option<NaiveTime>), BacktestError> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok((date, None));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|ts| (ts.date(), Some(ts.time())))
        .ok_or_else(|| BacktestError::DataFormat {
            reason: format!("invalid timestamp '{}'", value),
        })
}

fn parse_price(record: &csv::StringRecord, idx: usize, column: &str) -> Result<f64, BacktestError> {
    let raw = record.get(idx).ok_or_else(|| BacktestError::DataFormat {
        reason: format!("missing {} column", column),
    })?;
    raw.trim().parse().map_err(|e| BacktestError::DataFormat {
        reason: format!("invalid {} value '{}': {}", column, raw, e),
    })
}

fn parse_optional_price(
    record: &csv::StringRecord,
    idx: Option<usize>,
    column: &str,
    fallback: f64,
) -> Result<f64, BacktestError> {
    match idx {
        Some(i) if record.get(i).is_some_and(|v| !v.trim().is_empty()) => {
            parse_price(record, i, column)
        }
        _ => Ok(fallback),
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BacktestError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| BacktestError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| BacktestError::DataFormat {
                reason: format!("CSV header error: {}", e),
            })?
            .clone();
        let cols = Columns::locate(&headers)?;
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| BacktestError::DataFormat {
                reason: format!("CSV parse error: {}", e),
            })?;

            let raw_ts = record
                .get(cols.timestamp)
                .ok_or_else(|| BacktestError::DataFormat {
                    reason: "missing timestamp value".into(),
                })?;
            let (date, time) = parse_timestamp(raw_ts)?;

            if date < start_date || date > end_date {
                continue;
            }

            let close = parse_price(&record, cols.close, "close")?;
            bars.push(Bar {
                date,
                time,
                open: parse_optional_price(&record, cols.open, "open", close)?,
                high: parse_optional_price(&record, cols.high, "high", close)?,
                low: parse_optional_price(&record, cols.low, "low", close)?,
                close,
            });
        }

        bars.sort_by_key(|b| b.timestamp());
        debug!(symbol, bars = bars.len(), path = %path.display(), "loaded csv");
        Ok(bars)
    }
}
