//! Indicator pipeline.
//!
//! close -> baseline (EMA) -> disparity -> fast/slow EMA of disparity.
//! All recursions start at the first bar; rows are emitted only once
//! `warmup_bars` disparity observations exist, so every emitted row has both
//! smoothing windows seeded.

pub mod disparity;
pub mod ema;

use chrono::{NaiveDate, NaiveTime};
use tracing::warn;

use crate::domain::error::{BacktestError, DomainError};
use crate::domain::ohlcv::Bar;
use disparity::disparity;
use ema::Ema;

/// Derived values for one bar once warm-up is satisfied.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    /// Position of the source bar in the input sequence.
    pub bar_index: usize,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub close: f64,
    pub baseline: f64,
    pub disparity: f64,
    pub fast: f64,
    pub slow: f64,
}

impl IndicatorRow {
    /// fast - slow
    pub fn spread(&self) -> f64 {
        self.fast - self.slow
    }
}

/// A bar the pipeline could not process.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedBar {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub reason: DomainError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub rows: Vec<IndicatorRow>,
    pub skipped: Vec<SkippedBar>,
    /// Disparity observations required before the first row is emitted.
    pub warmup: usize,
    /// Disparity observations actually produced.
    pub observations: usize,
}

impl IndicatorSeries {
    fn empty(warmup: usize) -> Self {
        IndicatorSeries {
            rows: Vec::new(),
            skipped: Vec::new(),
            warmup,
            observations: 0,
        }
    }
}

pub fn warmup_bars(baseline_window: usize, fast_period: usize, slow_period: usize) -> usize {
    baseline_window.max(fast_period).max(slow_period)
}

/// Run the pipeline over `bars`.
///
/// A zero baseline skips the bar (it feeds neither smoothing stage). A
/// non-finite close aborts with [`BacktestError::NonFiniteClose`]. A zero
/// window yields an empty series.
pub fn compute_indicators(
    bars: &[Bar],
    baseline_window: usize,
    fast_period: usize,
    slow_period: usize,
) -> Result<IndicatorSeries, BacktestError> {
    let warmup = warmup_bars(baseline_window, fast_period, slow_period);
    if baseline_window == 0 || fast_period == 0 || slow_period == 0 {
        return Ok(IndicatorSeries::empty(warmup));
    }

    let mut series = IndicatorSeries::empty(warmup);
    series.rows.reserve(bars.len().saturating_sub(warmup - 1));

    let mut baseline_ema = Ema::new(baseline_window);
    let mut fast_ema = Ema::new(fast_period);
    let mut slow_ema = Ema::new(slow_period);

    for (i, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() {
            return Err(BacktestError::NonFiniteClose {
                index: i,
                value: bar.close,
            });
        }

        let baseline = baseline_ema.update(bar.close);
        let disparity = match disparity(bar.close, baseline) {
            Ok(d) => d,
            Err(reason) => {
                warn!(bar = i, date = %bar.date, %reason, "skipping bar");
                series.skipped.push(SkippedBar {
                    bar_index: i,
                    date: bar.date,
                    reason,
                });
                continue;
            }
        };

        let fast = fast_ema.update(disparity);
        let slow = slow_ema.update(disparity);
        series.observations += 1;

        if series.observations < warmup {
            continue;
        }

        series.rows.push(IndicatorRow {
            bar_index: i,
            date: bar.date,
            time: bar.time,
            close: bar.close,
            baseline,
            disparity,
            fast,
            slow,
        });
    }

    Ok(series)
}
