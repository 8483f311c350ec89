//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::retry_adapter::{RetryingDataPort, DEFAULT_MAX_RETRIES};
use crate::adapters::synthetic_adapter::{SyntheticAdapter, DEFAULT_SEED};
use crate::domain::backtest::{
    run_backtest, BacktestConfig, BacktestResult, RunStatus, DEFAULT_INITIAL_CAPITAL,
};
use crate::domain::config_validation::{
    parse_date, parse_time, read_double, read_int, validate_backtest_config,
    validate_instrument_config, BACKTEST_SECTION, MAX_RETRIES_LIMIT,
};
use crate::domain::error::BacktestError;
use crate::domain::indicator::compute_indicators;
use crate::domain::instrument::{parse_instruments, InstrumentConfig, SyntheticProfile};
use crate::domain::metrics::{summarize, summarize_combined, PerformanceSummary};
use crate::domain::signal::CrossoverPolicy;
use crate::domain::strategy::{SessionWindow, StrategyParameters, TrailingArm};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "disparity-trader",
    about = "Disparity Index crossover backtester"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest for every configured instrument
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Run only this instrument section
        #[arg(short, long)]
        instrument: Option<String>,
        /// Write CSV reports into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Use the seeded random-walk source regardless of config
        #[arg(long)]
        synthetic: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Export the indicator series of one instrument as CSV
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        instrument: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        synthetic: bool,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            instrument,
            output_dir,
            synthetic,
        } => run_backtest_command(
            &config,
            instrument.as_deref(),
            output_dir.as_deref(),
            synthetic,
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Indicators {
            config,
            instrument,
            output,
            synthetic,
        } => run_indicators(&config, &instrument, &output, synthetic),
    }
}

fn fail(err: &BacktestError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = BacktestError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        fail(&err)
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, BacktestError> {
    let start_date = parse_date(
        config.get_string(BACKTEST_SECTION, "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        config.get_string(BACKTEST_SECTION, "end_date").as_deref(),
        "end_date",
    )?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital: read_double(
            config,
            BACKTEST_SECTION,
            "initial_capital",
            DEFAULT_INITIAL_CAPITAL,
        )?,
    })
}

fn read_window(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> Result<usize, BacktestError> {
    let value = read_int(config, section, key, default as i64)?;
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| BacktestError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{} must be at least 1", key),
        })
}

fn read_enum<T: std::str::FromStr<Err = String>>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, BacktestError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|reason| BacktestError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason,
        }),
    }
}

fn read_session(config: &dyn ConfigPort, section: &str) -> Option<SessionWindow> {
    if !config.get_bool(section, "session_gate", true) {
        return None;
    }
    let default = SessionWindow::default();
    let read = |key: &str, fallback| {
        config
            .get_string(section, key)
            .and_then(|s| parse_time(&s))
            .unwrap_or(fallback)
    };
    Some(SessionWindow {
        open: read("session_open", default.open),
        close: read("session_close", default.close),
    })
}

/// Read one instrument section into typed settings, defaults filling gaps.
pub fn build_instrument(config: &dyn ConfigPort, name: &str) -> Result<InstrumentConfig, BacktestError> {
    validate_instrument_config(config, name)?;
    let d = StrategyParameters::default();
    let params = StrategyParameters {
        baseline_window: read_window(config, name, "baseline_window", d.baseline_window)?,
        fast_period: read_window(config, name, "fast_period", d.fast_period)?,
        slow_period: read_window(config, name, "slow_period", d.slow_period)?,
        entry_threshold: read_double(config, name, "entry_threshold", d.entry_threshold)?,
        absolute_stop: read_double(config, name, "absolute_stop", d.absolute_stop)?,
        trailing_stop_percent: read_double(
            config,
            name,
            "trailing_stop_percent",
            d.trailing_stop_percent,
        )?,
        crossover: read_enum(config, name, "crossover", CrossoverPolicy::default())?,
        trailing_arm: read_enum(config, name, "trailing_arm", TrailingArm::default())?,
        session: read_session(config, name),
    };

    let profile = SyntheticProfile::default();
    Ok(InstrumentConfig {
        name: name.to_string(),
        symbol: config
            .get_string(name, "symbol")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| name.to_uppercase()),
        params,
        synthetic: SyntheticProfile {
            start_price: read_double(config, name, "synthetic_start_price", profile.start_price)?,
            volatility: read_double(config, name, "synthetic_volatility", profile.volatility)?,
        },
    })
}

/// Instrument section names to run: the override alone, or the configured list.
pub fn resolve_instruments(
    instrument_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, BacktestError> {
    if let Some(name) = instrument_override {
        return Ok(vec![name.trim().to_lowercase()]);
    }
    let list = config
        .get_string(BACKTEST_SECTION, "instruments")
        .ok_or_else(|| BacktestError::ConfigMissing {
            section: BACKTEST_SECTION.to_string(),
            key: "instruments".to_string(),
        })?;
    parse_instruments(&list).map_err(|e| BacktestError::ConfigInvalid {
        section: BACKTEST_SECTION.to_string(),
        key: "instruments".to_string(),
        reason: e.to_string(),
    })
}

fn use_synthetic(config: &dyn ConfigPort, force: bool) -> bool {
    force
        || config
            .get_string(BACKTEST_SECTION, "source")
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("synthetic"))
}

/// Build the configured data source, wrap it in retries and hand it to `f`.
fn with_data_port<R>(
    config: &dyn ConfigPort,
    instruments: &[InstrumentConfig],
    synthetic: bool,
    f: impl FnOnce(&(dyn DataPort + Sync)) -> R,
) -> Result<R, BacktestError> {
    let max_retries = read_int(config, BACKTEST_SECTION, "max_retries", DEFAULT_MAX_RETRIES as i64)?;
    let delay_ms = read_int(config, BACKTEST_SECTION, "retry_delay_ms", 200)?;
    let max_retries = u32::try_from(max_retries)
        .unwrap_or(DEFAULT_MAX_RETRIES)
        .min(MAX_RETRIES_LIMIT);
    let base_delay = Duration::from_millis(u64::try_from(delay_ms).unwrap_or(0));

    if use_synthetic(config, synthetic) {
        let seed = read_int(config, BACKTEST_SECTION, "synthetic_seed", DEFAULT_SEED as i64)?;
        let mut adapter = SyntheticAdapter::new(seed as u64);
        for inst in instruments {
            adapter = adapter.with_profile(&inst.symbol, inst.synthetic);
        }
        info!(seed, "using synthetic data source");
        Ok(f(&RetryingDataPort::new(adapter, max_retries, base_delay)))
    } else {
        let data_dir = config
            .get_string(BACKTEST_SECTION, "data_dir")
            .unwrap_or_else(|| "data".to_string());
        info!(data_dir = %data_dir, "using csv data source");
        let adapter = CsvAdapter::new(PathBuf::from(data_dir));
        Ok(f(&RetryingDataPort::new(adapter, max_retries, base_delay)))
    }
}

/// Outcome of one instrument's independent run.
#[derive(Debug)]
pub struct InstrumentRun {
    pub name: String,
    pub outcome: Result<BacktestResult, BacktestError>,
}

/// Fetch and backtest every instrument. Runs are independent and execute in
/// parallel; results keep the input order.
pub fn run_backtest_pipeline(
    data_port: &(dyn DataPort + Sync),
    instruments: &[InstrumentConfig],
    bt_config: &BacktestConfig,
) -> Vec<InstrumentRun> {
    instruments
        .par_iter()
        .map(|inst| {
            let outcome = data_port
                .fetch_bars(&inst.symbol, bt_config.start_date, bt_config.end_date)
                .and_then(|bars| {
                    info!(instrument = %inst.name, symbol = %inst.symbol, bars = bars.len(), "fetched bars");
                    run_backtest(&inst.symbol, &bars, &inst.params, bt_config.initial_capital)
                });
            InstrumentRun {
                name: inst.name.clone(),
                outcome,
            }
        })
        .collect()
}

fn print_summary(title: &str, s: &PerformanceSummary) {
    let sign = |v: f64| if v >= 0.0 { "+" } else { "" };
    println!("\n=== {} ===", title);
    println!("Total P&L:        {}{:.2}", sign(s.total_pnl), s.total_pnl);
    println!("Total Return:     {:.2}%", s.total_return_pct);
    println!(
        "Trades:           {} ({} won, {} lost, {} flat)",
        s.trade_count, s.win_count, s.loss_count, s.breakeven_count
    );
    println!("Win Rate:         {:.1}%", s.win_rate_pct);
    println!("Profit Factor:    {:.2}", s.profit_factor);
    println!("Avg Win / Loss:   {:.2} / {:.2}", s.avg_win, s.avg_loss);
    if !s.exit_reasons.is_empty() {
        let reasons: Vec<String> = s
            .exit_reasons
            .iter()
            .map(|(r, n)| format!("{}={}", r, n))
            .collect();
        println!("Exits:            {}", reasons.join(", "));
    }
    if let Some(open) = &s.unrealized {
        println!(
            "Open position:    entered {} at {:.2}, last {:.2} ({}{:.2} unrealized)",
            open.entry_date,
            open.entry_price,
            open.last_price,
            sign(open.unrealized_pnl),
            open.unrealized_pnl
        );
    } else if s.unrealized_pnl != 0.0 {
        println!("Unrealized P&L:   {}{:.2}", sign(s.unrealized_pnl), s.unrealized_pnl);
    }
    if !s.monthly_pnl.is_empty() {
        println!("Monthly P&L:");
        for (month, pnl) in &s.monthly_pnl {
            println!("  {}  {}{:.2}", month, sign(*pnl), pnl);
        }
    }
}

fn run_backtest_command(
    config_path: &Path,
    instrument_override: Option<&str>,
    output_dir: Option<&Path>,
    synthetic: bool,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(&e);
    }

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let instruments = match resolve_instruments(instrument_override, &adapter).and_then(|names| {
        names
            .iter()
            .map(|n| build_instrument(&adapter, n))
            .collect::<Result<Vec<_>, _>>()
    }) {
        Ok(i) => i,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "Running backtest: {} instrument(s), {} to {}",
        instruments.len(),
        bt_config.start_date,
        bt_config.end_date,
    );

    let runs = match with_data_port(&adapter, &instruments, synthetic, |port| {
        run_backtest_pipeline(port, &instruments, &bt_config)
    }) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    let reporter = CsvReportAdapter::new();
    let mut completed: Vec<&BacktestResult> = Vec::new();
    let mut first_error: Option<&BacktestError> = None;

    for run in &runs {
        let result = match &run.outcome {
            Ok(r) => r,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", run.name, e);
                first_error.get_or_insert(e);
                continue;
            }
        };

        if let RunStatus::InsufficientHistory { bars, required } = result.status {
            warn!(instrument = %run.name, bars, required, "not enough bars for indicators");
            eprintln!(
                "warning: {} has {} bars, {} needed; no trades evaluated",
                run.name, bars, required
            );
        }

        let summary = summarize(result);
        print_summary(&format!("{} ({})", run.name, result.symbol), &summary);

        if let Some(dir) = output_dir {
            if let Err(e) = reporter.write(&run.name, result, &summary, dir) {
                return fail(&e);
            }
        }
        completed.push(result);
    }

    if completed.is_empty() {
        return match first_error {
            Some(e) => fail(e),
            None => ExitCode::from(5),
        };
    }

    if completed.len() > 1 {
        print_summary("Combined", &summarize_combined(&completed));
    }

    if let Some(dir) = output_dir {
        eprintln!("\nReports written to: {}", dir.display());
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(&e);
    }

    let names = match resolve_instruments(None, &adapter) {
        Ok(n) => n,
        Err(e) => return fail(&e),
    };

    for name in &names {
        match build_instrument(&adapter, name) {
            Ok(inst) => {
                let p = &inst.params;
                eprintln!(
                    "  {} ({}): baseline={} fast={} slow={} threshold={} stop={} trail={}% crossover={} arm={}",
                    inst.name,
                    inst.symbol,
                    p.baseline_window,
                    p.fast_period,
                    p.slow_period,
                    p.entry_threshold,
                    p.absolute_stop,
                    p.trailing_stop_percent,
                    p.crossover,
                    p.trailing_arm,
                );
            }
            Err(e) => return fail(&e),
        }
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_indicators(config_path: &Path, instrument: &str, output: &Path, synthetic: bool) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let (bt_config, inst) = match build_backtest_config(&adapter)
        .and_then(|c| Ok((c, build_instrument(&adapter, &instrument.trim().to_lowercase())?)))
    {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };

    let fetched = with_data_port(&adapter, std::slice::from_ref(&inst), synthetic, |port| {
        port.fetch_bars(&inst.symbol, bt_config.start_date, bt_config.end_date)
    });
    let bars = match fetched.and_then(|r| r) {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };

    let p = &inst.params;
    let series = match compute_indicators(&bars, p.baseline_window, p.fast_period, p.slow_period) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if let Err(e) = CsvReportAdapter::new().write_indicators(&series.rows, output) {
        return fail(&e);
    }

    eprintln!(
        "Wrote {} indicator rows ({} bars, {} skipped) to {}",
        series.rows.len(),
        bars.len(),
        series.skipped.len(),
        output.display()
    );
    ExitCode::SUCCESS
}
