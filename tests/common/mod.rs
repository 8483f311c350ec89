#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use disparity_trader::domain::backtest::BacktestConfig;
use disparity_trader::domain::error::BacktestError;
pub use disparity_trader::domain::ohlcv::Bar;
use disparity_trader::domain::signal::CrossoverPolicy;
use disparity_trader::domain::strategy::{StrategyParameters, TrailingArm};
use disparity_trader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BacktestError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacktestError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One daily bar per close, starting 2024-01-01.
pub fn daily_bars(closes: &[f64]) -> Vec<Bar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::daily(start + Duration::days(i as i64), c))
        .collect()
}

/// Bars on 2024-01-15 at the given `HH:MM` times.
pub fn intraday_bars(points: &[(&str, f64)]) -> Vec<Bar> {
    points
        .iter()
        .map(|(t, c)| {
            let time = NaiveTime::parse_from_str(t, "%H:%M").unwrap();
            Bar::intraday(NaiveDateTime::new(date(2024, 1, 15), time), *c)
        })
        .collect()
}

/// baseline 2, fast 1, slow 2, no threshold, stops disabled, no session.
pub fn small_params() -> StrategyParameters {
    StrategyParameters {
        baseline_window: 2,
        fast_period: 1,
        slow_period: 2,
        entry_threshold: 0.0,
        absolute_stop: 0.0,
        trailing_stop_percent: 0.0,
        crossover: CrossoverPolicy::Edge,
        trailing_arm: TrailingArm::Immediate,
        session: None,
    }
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        initial_capital: 100_000.0,
    }
}
