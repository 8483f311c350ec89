//! Price bar representation.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// One observation of an instrument.
///
/// Daily series leave `time` unset; intraday series carry the time-of-day
/// used by the trading-session gate. Only `close` drives the strategy, the
/// remaining prices are carried through for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    /// A daily bar where only the close is known.
    pub fn daily(date: NaiveDate, close: f64) -> Self {
        Bar {
            date,
            time: None,
            open: close,
            high: close,
            low: close,
            close,
        }
    }

    /// An intraday bar where only the close is known.
    pub fn intraday(timestamp: NaiveDateTime, close: f64) -> Self {
        Bar {
            date: timestamp.date(),
            time: Some(timestamp.time()),
            open: close,
            high: close,
            low: close,
            close,
        }
    }

    /// Date and time combined; daily bars sort at midnight.
    pub fn timestamp(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or_default())
    }

    pub fn is_intraday(&self) -> bool {
        self.time.is_some()
    }
}
