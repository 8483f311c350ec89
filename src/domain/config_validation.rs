//! Configuration validation.
//!
//! Validates every field before any data is fetched. Missing keys fall back
//! to the documented defaults; present keys must parse and be in range.

use crate::domain::error::BacktestError;
use crate::domain::instrument::parse_instruments;
use crate::domain::signal::CrossoverPolicy;
use crate::domain::strategy::TrailingArm;
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveDate, NaiveTime};

pub const BACKTEST_SECTION: &str = "backtest";

/// Upper bound on provider retries after the first attempt.
pub const MAX_RETRIES_LIMIT: u32 = 10;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_initial_capital(config)?;
    validate_dates(config)?;
    validate_source(config)?;
    validate_retry(config)?;
    let names = validate_instruments(config)?;
    for name in &names {
        validate_instrument_config(config, name)?;
    }
    Ok(())
}

pub fn validate_instrument_config(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<(), BacktestError> {
    if !config.has_section(section) {
        return Err(BacktestError::ConfigMissing {
            section: section.to_string(),
            key: "symbol".to_string(),
        });
    }
    validate_windows(config, section)?;
    validate_non_negative(config, section, "entry_threshold")?;
    validate_non_negative(config, section, "absolute_stop")?;
    validate_trailing_percent(config, section)?;
    validate_enums(config, section)?;
    validate_session(config, section)?;
    validate_synthetic(config, section)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Read a float key, rejecting values that are present but not numeric.
pub fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, format!("'{}' is not a number", raw))),
    }
}

/// Read an integer key, rejecting values that are present but not integers.
pub fn read_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(section, key, format!("'{}' is not an integer", raw))),
    }
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, BacktestError> {
    match value {
        None => Err(BacktestError::ConfigMissing {
            section: BACKTEST_SECTION.to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                BACKTEST_SECTION,
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

/// `HH:MM` or `HH:MM:SS`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value = read_double(config, BACKTEST_SECTION, "initial_capital", 100_000.0)?;
    if value <= 0.0 {
        return Err(invalid(
            BACKTEST_SECTION,
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let start_str = config.get_string(BACKTEST_SECTION, "start_date");
    let end_str = config.get_string(BACKTEST_SECTION, "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(invalid(
            BACKTEST_SECTION,
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn validate_source(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match config.get_string(BACKTEST_SECTION, "source") {
        None => Ok(()),
        Some(s) => match s.trim().to_lowercase().as_str() {
            "csv" | "synthetic" => Ok(()),
            other => Err(invalid(
                BACKTEST_SECTION,
                "source",
                format!("unknown source '{}' (expected csv or synthetic)", other),
            )),
        },
    }
}

fn validate_retry(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    for key in ["max_retries", "retry_delay_ms"] {
        if read_int(config, BACKTEST_SECTION, key, 0)? < 0 {
            return Err(invalid(
                BACKTEST_SECTION,
                key,
                format!("{} must be non-negative", key),
            ));
        }
    }
    let retries = read_int(config, BACKTEST_SECTION, "max_retries", 0)?;
    if retries > i64::from(MAX_RETRIES_LIMIT) {
        return Err(invalid(
            BACKTEST_SECTION,
            "max_retries",
            format!("max_retries must be at most {}", MAX_RETRIES_LIMIT),
        ));
    }
    Ok(())
}

fn validate_instruments(config: &dyn ConfigPort) -> Result<Vec<String>, BacktestError> {
    match config.get_string(BACKTEST_SECTION, "instruments") {
        Some(list) if !list.trim().is_empty() => parse_instruments(&list)
            .map_err(|e| invalid(BACKTEST_SECTION, "instruments", e.to_string())),
        _ => Err(BacktestError::ConfigMissing {
            section: BACKTEST_SECTION.to_string(),
            key: "instruments".to_string(),
        }),
    }
}

fn validate_windows(config: &dyn ConfigPort, section: &str) -> Result<(), BacktestError> {
    for (key, default) in [
        ("baseline_window", 20),
        ("fast_period", 3),
        ("slow_period", 6),
    ] {
        if read_int(config, section, key, default)? < 1 {
            return Err(invalid(section, key, format!("{} must be at least 1", key)));
        }
    }
    Ok(())
}

fn validate_non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), BacktestError> {
    if read_double(config, section, key, 0.0)? < 0.0 {
        return Err(invalid(section, key, format!("{} must be non-negative", key)));
    }
    Ok(())
}

fn validate_trailing_percent(config: &dyn ConfigPort, section: &str) -> Result<(), BacktestError> {
    let value = read_double(config, section, "trailing_stop_percent", 0.5)?;
    if !(0.0..100.0).contains(&value) {
        return Err(invalid(
            section,
            "trailing_stop_percent",
            "trailing_stop_percent must be in [0, 100)",
        ));
    }
    Ok(())
}

fn validate_enums(config: &dyn ConfigPort, section: &str) -> Result<(), BacktestError> {
    if let Some(s) = config.get_string(section, "crossover") {
        s.parse::<CrossoverPolicy>()
            .map_err(|e| invalid(section, "crossover", e))?;
    }
    if let Some(s) = config.get_string(section, "trailing_arm") {
        s.parse::<TrailingArm>()
            .map_err(|e| invalid(section, "trailing_arm", e))?;
    }
    Ok(())
}

fn validate_session(config: &dyn ConfigPort, section: &str) -> Result<(), BacktestError> {
    let mut bounds = Vec::with_capacity(2);
    for key in ["session_open", "session_close"] {
        if let Some(raw) = config.get_string(section, key) {
            let t = parse_time(&raw)
                .ok_or_else(|| invalid(section, key, format!("'{}' is not HH:MM", raw)))?;
            bounds.push(t);
        }
    }
    if let [open, close] = bounds[..] {
        if open >= close {
            return Err(invalid(
                section,
                "session_open",
                "session_open must be before session_close",
            ));
        }
    }
    Ok(())
}

fn validate_synthetic(config: &dyn ConfigPort, section: &str) -> Result<(), BacktestError> {
    if read_double(config, section, "synthetic_start_price", 1.0)? <= 0.0 {
        return Err(invalid(
            section,
            "synthetic_start_price",
            "synthetic_start_price must be positive",
        ));
    }
    validate_non_negative(config, section, "synthetic_volatility")
}
