//! Bounded retry around any [`DataPort`].
//!
//! Callers only ever see a non-empty series or
//! [`BacktestError::DataUnavailable`].

use std::time::Duration;

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::config_validation::MAX_RETRIES_LIMIT;
use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);

pub struct RetryingDataPort<P> {
    inner: P,
    max_retries: u32,
    base_delay: Duration,
}

impl<P: DataPort> RetryingDataPort<P> {
    /// `max_retries` is clamped to [`MAX_RETRIES_LIMIT`].
    pub fn new(inner: P, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries: max_retries.min(MAX_RETRIES_LIMIT),
            base_delay,
        }
    }

    #[cfg(test)]
    fn inner(&self) -> &P {
        &self.inner
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl<P: DataPort> DataPort for RetryingDataPort<P> {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BacktestError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                warn!(
                    symbol,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying data fetch"
                );
                std::thread::sleep(delay);
            }

            match self.inner.fetch_bars(symbol, start_date, end_date) {
                Ok(bars) if bars.is_empty() => {
                    return Err(BacktestError::DataUnavailable {
                        symbol: symbol.to_string(),
                        reason: format!("no bars between {} and {}", start_date, end_date),
                    });
                }
                Ok(bars) => return Ok(bars),
                Err(e) if e.is_retryable() => {
                    warn!(symbol, attempt, error = %e, "data fetch failed");
                    last_error = Some(e);
                }
                Err(e) => {
                    return Err(BacktestError::DataUnavailable {
                        symbol: symbol.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let reason = match last_error {
            Some(e) => format!("{} after {} attempts", e, self.max_retries + 1),
            None => "max retries exceeded".to_string(),
        };
        Err(BacktestError::DataUnavailable {
            symbol: symbol.to_string(),
            reason,
        })
    }
}
