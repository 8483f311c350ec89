//! CSV report adapter implementing ReportPort.
//!
//! One directory per run; files are prefixed with the instrument name:
//! `<name>_trades.csv`, `<name>_daily_pnl.csv`, `<name>_monthly_pnl.csv`
//! and `<name>_summary.csv`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use csv::Writer;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::domain::indicator::IndicatorRow;
use crate::domain::metrics::PerformanceSummary;
use crate::domain::position::ExitReason;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }

    pub fn trades_path(output_dir: &Path, name: &str) -> PathBuf {
        output_dir.join(format!("{}_trades.csv", name))
    }

    pub fn daily_path(output_dir: &Path, name: &str) -> PathBuf {
        output_dir.join(format!("{}_daily_pnl.csv", name))
    }

    pub fn monthly_path(output_dir: &Path, name: &str) -> PathBuf {
        output_dir.join(format!("{}_monthly_pnl.csv", name))
    }

    pub fn summary_path(output_dir: &Path, name: &str) -> PathBuf {
        output_dir.join(format!("{}_summary.csv", name))
    }
}

fn report_err(path: &Path, e: impl std::fmt::Display) -> BacktestError {
    BacktestError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn open(path: &Path) -> Result<Writer<fs::File>, BacktestError> {
    Writer::from_path(path).map_err(|e| report_err(path, e))
}

fn fmt_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn fmt_price(value: f64) -> String {
    format!("{:.4}", value)
}

fn write_trades(path: &Path, result: &BacktestResult) -> Result<(), BacktestError> {
    let mut w = open(path)?;
    w.write_record([
        "entry_date",
        "entry_time",
        "entry_price",
        "exit_date",
        "exit_time",
        "exit_price",
        "exit_reason",
        "quantity",
        "pnl",
    ])
    .map_err(|e| report_err(path, e))?;

    for t in &result.ledger {
        w.write_record([
            t.entry_date.to_string(),
            fmt_time(t.entry_time),
            fmt_price(t.entry_price),
            t.exit_date.to_string(),
            fmt_time(t.exit_time),
            fmt_price(t.exit_price),
            t.exit_reason.to_string(),
            fmt_price(t.quantity),
            format!("{:.2}", t.pnl),
        ])
        .map_err(|e| report_err(path, e))?;
    }
    w.flush()?;
    Ok(())
}

fn write_buckets<K: std::fmt::Display>(
    path: &Path,
    header: &str,
    buckets: impl IntoIterator<Item = (K, f64)>,
) -> Result<(), BacktestError> {
    let mut w = open(path)?;
    w.write_record([header, "pnl"])
        .map_err(|e| report_err(path, e))?;
    for (key, pnl) in buckets {
        w.write_record([key.to_string(), format!("{:.2}", pnl)])
            .map_err(|e| report_err(path, e))?;
    }
    w.flush()?;
    Ok(())
}

fn write_summary(
    path: &Path,
    result: &BacktestResult,
    summary: &PerformanceSummary,
) -> Result<(), BacktestError> {
    let mut rows: Vec<(String, String)> = vec![
        ("symbol".into(), result.symbol.clone()),
        ("initial_capital".into(), format!("{:.2}", summary.initial_capital)),
        ("total_pnl".into(), format!("{:.2}", summary.total_pnl)),
        ("total_return_pct".into(), format!("{:.4}", summary.total_return_pct)),
        ("trade_count".into(), summary.trade_count.to_string()),
        ("win_count".into(), summary.win_count.to_string()),
        ("loss_count".into(), summary.loss_count.to_string()),
        ("breakeven_count".into(), summary.breakeven_count.to_string()),
        ("win_rate_pct".into(), format!("{:.2}", summary.win_rate_pct)),
        ("avg_win".into(), format!("{:.2}", summary.avg_win)),
        ("avg_loss".into(), format!("{:.2}", summary.avg_loss)),
        ("largest_win".into(), format!("{:.2}", summary.largest_win)),
        ("largest_loss".into(), format!("{:.2}", summary.largest_loss)),
        ("profit_factor".into(), format!("{:.4}", summary.profit_factor)),
        ("avg_holding_days".into(), format!("{:.2}", summary.avg_holding_days)),
        ("skipped_bars".into(), result.skipped_bars.len().to_string()),
    ];
    for reason in ExitReason::ALL {
        rows.push((
            format!("exits_{}", reason),
            summary.exit_count(reason).to_string(),
        ));
    }
    if let Some(open) = &summary.unrealized {
        rows.push(("open_entry_date".into(), open.entry_date.to_string()));
        rows.push(("open_entry_price".into(), fmt_price(open.entry_price)));
        rows.push(("open_last_price".into(), fmt_price(open.last_price)));
    }
    rows.push(("unrealized_pnl".into(), format!("{:.2}", summary.unrealized_pnl)));

    let mut w = open(path)?;
    w.write_record(["metric", "value"])
        .map_err(|e| report_err(path, e))?;
    for (k, v) in rows {
        w.write_record([k, v]).map_err(|e| report_err(path, e))?;
    }
    w.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        name: &str,
        result: &BacktestResult,
        summary: &PerformanceSummary,
        output_dir: &Path,
    ) -> Result<(), BacktestError> {
        fs::create_dir_all(output_dir)?;

        write_trades(&Self::trades_path(output_dir, name), result)?;
        write_buckets(
            &Self::daily_path(output_dir, name),
            "date",
            summary.daily_pnl.iter().map(|(d, p)| (*d, *p)),
        )?;
        write_buckets(
            &Self::monthly_path(output_dir, name),
            "month",
            summary.monthly_pnl.iter().map(|(m, p)| (*m, *p)),
        )?;
        write_summary(&Self::summary_path(output_dir, name), result, summary)?;

        info!(name, dir = %output_dir.display(), trades = result.ledger.len(), "report written");
        Ok(())
    }

    fn write_indicators(
        &self,
        rows: &[IndicatorRow],
        output_path: &Path,
    ) -> Result<(), BacktestError> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut w = open(output_path)?;
        w.write_record([
            "date", "time", "close", "baseline", "disparity", "fast", "slow",
        ])
        .map_err(|e| report_err(output_path, e))?;
        for r in rows {
            w.write_record([
                r.date.to_string(),
                fmt_time(r.time),
                fmt_price(r.close),
                fmt_price(r.baseline),
                format!("{:.6}", r.disparity),
                format!("{:.6}", r.fast),
                format!("{:.6}", r.slow),
            ])
            .map_err(|e| report_err(output_path, e))?;
        }
        w.flush()?;
        Ok(())
    }
}
