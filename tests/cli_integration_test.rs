//! CLI orchestration tests: INI files on disk, CSV data directories and
//! report output.

mod common;

use common::*;
use disparity_trader::adapters::csv_adapter::CsvAdapter;
use disparity_trader::adapters::csv_report_adapter::CsvReportAdapter;
use disparity_trader::adapters::file_config_adapter::FileConfigAdapter;
use disparity_trader::cli::{self, Cli, Command};
use disparity_trader::domain::config_validation::validate_backtest_config;
use disparity_trader::domain::error::BacktestError;
use disparity_trader::domain::metrics::summarize;
use disparity_trader::domain::signal::CrossoverPolicy;
use disparity_trader::domain::strategy::{SessionWindow, TrailingArm};
use disparity_trader::ports::report_port::ReportPort;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn exit_status(code: ExitCode) -> String {
    format!("{:?}", code)
}

const VALID_INI: &str = r#"
[backtest]
initial_capital = 100000.0
start_date = 2024-01-01
end_date = 2024-12-31
instruments = nifty, banknifty

[nifty]
symbol = NSEI
baseline_window = 2
fast_period = 1
slow_period = 2
entry_threshold = 0
absolute_stop = 5
trailing_stop_percent = 0
crossover = level

[banknifty]
symbol = NSEBANK
"#;

/// VALID_INI with extra lines at the top of its [backtest] section.
fn with_backtest_keys(extra: &str) -> String {
    VALID_INI.replacen("[backtest]\n", &format!("[backtest]\n{}\n", extra), 1)
}

fn write_daily_csv(dir: &Path, symbol: &str, closes: &[f64]) {
    let mut out = String::from("date,open,high,low,close\n");
    for bar in daily_bars(closes) {
        out.push_str(&format!(
            "{},{c},{c},{c},{c}\n",
            bar.date,
            c = bar.close
        ));
    }
    fs::write(dir.join(format!("{}.csv", symbol)), out).unwrap();
}

mod config_loading {
    use super::*;

    #[test]
    fn backtest_section_parses() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();
        assert_eq!(config.start_date, date(2024, 1, 1));
        assert_eq!(config.end_date, date(2024, 12, 31));
        assert_eq!(config.initial_capital, 100_000.0);
    }

    #[test]
    fn capital_defaults_when_absent() {
        let ini = "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-06-30\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();
        assert_eq!(config.initial_capital, 100_000.0);
    }

    #[test]
    fn missing_start_date_is_reported() {
        let ini = "[backtest]\nend_date = 2024-12-31\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = cli::build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { ref key, .. } if key == "start_date"));
    }

    #[test]
    fn malformed_date_is_invalid() {
        let ini = "[backtest]\nstart_date = 2024/01/01\nend_date = 2024-12-31\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = cli::build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { .. }));
    }

    #[test]
    fn instrument_reads_overrides() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let inst = cli::build_instrument(&adapter, "nifty").unwrap();
        assert_eq!(inst.symbol, "NSEI");
        assert_eq!(inst.params.baseline_window, 2);
        assert_eq!(inst.params.fast_period, 1);
        assert_eq!(inst.params.slow_period, 2);
        assert_eq!(inst.params.entry_threshold, 0.0);
        assert_eq!(inst.params.absolute_stop, 5.0);
        assert_eq!(inst.params.crossover, CrossoverPolicy::Level);
    }

    #[test]
    fn instrument_defaults_fill_gaps() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let inst = cli::build_instrument(&adapter, "banknifty").unwrap();
        assert_eq!(inst.symbol, "NSEBANK");
        assert_eq!(inst.params.baseline_window, 20);
        assert_eq!(inst.params.fast_period, 3);
        assert_eq!(inst.params.slow_period, 6);
        assert_eq!(inst.params.entry_threshold, 1.5);
        assert_eq!(inst.params.absolute_stop, 600.0);
        assert_eq!(inst.params.trailing_stop_percent, 0.5);
        assert_eq!(inst.params.crossover, CrossoverPolicy::Edge);
        assert_eq!(inst.params.trailing_arm, TrailingArm::Immediate);
        assert_eq!(inst.params.session, Some(SessionWindow::default()));
    }

    #[test]
    fn symbol_defaults_to_uppercased_section() {
        let ini = "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-12-31\n\n[finnifty]\nfast_period = 4\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let inst = cli::build_instrument(&adapter, "finnifty").unwrap();
        assert_eq!(inst.symbol, "FINNIFTY");
        assert_eq!(inst.params.fast_period, 4);
    }

    #[test]
    fn session_gate_can_be_disabled() {
        let ini = "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-12-31\n\n[nifty]\nsession_gate = false\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let inst = cli::build_instrument(&adapter, "nifty").unwrap();
        assert_eq!(inst.params.session, None);
    }

    #[test]
    fn undefined_instrument_section_fails() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let err = cli::build_instrument(&adapter, "sensex").unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { .. }));
    }

    #[test]
    fn zero_window_is_rejected() {
        let ini = "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-12-31\n\n[nifty]\nslow_period = 0\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = cli::build_instrument(&adapter, "nifty").unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { ref key, .. } if key == "slow_period"));
    }

    #[test]
    fn unknown_crossover_policy_is_rejected() {
        let ini = "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-12-31\n\n[nifty]\ncrossover = sideways\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        assert!(cli::build_instrument(&adapter, "nifty").is_err());
    }
}

mod instrument_resolution {
    use super::*;

    #[test]
    fn configured_list_is_used() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let names = cli::resolve_instruments(None, &adapter).unwrap();
        assert_eq!(names, vec!["nifty", "banknifty"]);
    }

    #[test]
    fn override_wins_over_list() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let names = cli::resolve_instruments(Some(" BankNifty "), &adapter).unwrap();
        assert_eq!(names, vec!["banknifty"]);
    }

    #[test]
    fn missing_list_is_an_error() {
        let ini = "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-12-31\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = cli::resolve_instruments(None, &adapter).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { ref key, .. } if key == "instruments"));
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let ini = "[backtest]\ninstruments = nifty, NIFTY\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        assert!(cli::resolve_instruments(None, &adapter).is_err());
    }
}

mod validation {
    use super::*;

    #[test]
    fn valid_config_passes() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        assert!(validate_backtest_config(&adapter).is_ok());
    }

    #[test]
    fn listed_but_undefined_instrument_fails() {
        let ini = "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-12-31\ninstruments = nifty\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        assert!(validate_backtest_config(&adapter).is_err());
    }

    #[test]
    fn validate_command_exit_codes() {
        let good = write_temp_ini(VALID_INI);
        let code = cli::run(Cli {
            command: Command::Validate {
                config: good.path().to_path_buf(),
            },
        });
        assert!(exit_status(code).contains("(0)"));

        let bad = write_temp_ini("[backtest]\nstart_date = 2024-01-01\n");
        let code = cli::run(Cli {
            command: Command::Validate {
                config: bad.path().to_path_buf(),
            },
        });
        assert!(exit_status(code).contains("(2)"));
    }
}

mod csv_pipeline {
    use super::*;

    #[test]
    fn csv_data_through_pipeline_into_reports() {
        let data_dir = tempfile::tempdir().unwrap();
        write_daily_csv(data_dir.path(), "NSEI", &[100.0, 102.0, 98.0, 90.0, 80.0]);

        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let bt_config = cli::build_backtest_config(&adapter).unwrap();
        let instruments = vec![
            cli::build_instrument(&adapter, "nifty").unwrap(),
            cli::build_instrument(&adapter, "banknifty").unwrap(),
        ];

        let port = CsvAdapter::new(data_dir.path().to_path_buf());
        let runs = cli::run_backtest_pipeline(&port, &instruments, &bt_config);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].name, "nifty");
        assert_eq!(runs[1].name, "banknifty");
        // no NSEBANK.csv in the data directory
        assert!(runs[1].outcome.is_err());

        let result = runs[0].outcome.as_ref().unwrap();
        assert_eq!(result.ledger.len(), 1);

        let out_dir = tempfile::tempdir().unwrap();
        let summary = summarize(result);
        CsvReportAdapter::new()
            .write("nifty", result, &summary, out_dir.path())
            .unwrap();

        let trades = fs::read_to_string(CsvReportAdapter::trades_path(out_dir.path(), "nifty")).unwrap();
        let lines: Vec<&str> = trades.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("2024-01-02,,102.0000,2024-01-03,,98.0000,crossover_signal,"));

        let daily = fs::read_to_string(CsvReportAdapter::daily_path(out_dir.path(), "nifty")).unwrap();
        assert!(daily.contains("2024-01-03,-3921.57"));
        let monthly = fs::read_to_string(CsvReportAdapter::monthly_path(out_dir.path(), "nifty")).unwrap();
        assert!(monthly.contains("2024-01,-3921.57"));
        assert!(CsvReportAdapter::summary_path(out_dir.path(), "nifty").exists());
    }

    #[test]
    fn backtest_command_writes_reports_for_available_instruments() {
        let data_dir = tempfile::tempdir().unwrap();
        write_daily_csv(data_dir.path(), "NSEI", &[100.0, 102.0, 98.0, 90.0, 80.0]);
        let out_dir = tempfile::tempdir().unwrap();

        let ini = with_backtest_keys(
            &format!("data_dir = {}\nmax_retries = 0\nretry_delay_ms = 0", data_dir.path().display()),
        );
        let file = write_temp_ini(&ini);

        let code = cli::run(Cli {
            command: Command::Backtest {
                config: file.path().to_path_buf(),
                instrument: None,
                output_dir: Some(out_dir.path().to_path_buf()),
                synthetic: false,
            },
        });

        assert!(exit_status(code).contains("(0)"));
        assert!(CsvReportAdapter::trades_path(out_dir.path(), "nifty").exists());
        assert!(!CsvReportAdapter::trades_path(out_dir.path(), "banknifty").exists());
    }

    #[test]
    fn backtest_command_fails_when_no_instrument_has_data() {
        let data_dir = tempfile::tempdir().unwrap();
        let ini = with_backtest_keys(
            &format!("data_dir = {}\nmax_retries = 0\nretry_delay_ms = 0", data_dir.path().display()),
        );
        let file = write_temp_ini(&ini);

        let code = cli::run(Cli {
            command: Command::Backtest {
                config: file.path().to_path_buf(),
                instrument: Some("nifty".into()),
                output_dir: None,
                synthetic: false,
            },
        });
        assert!(exit_status(code).contains("(5)"));
    }

    #[test]
    fn indicators_command_exports_rows() {
        let data_dir = tempfile::tempdir().unwrap();
        write_daily_csv(data_dir.path(), "NSEI", &[100.0, 102.0, 98.0, 90.0, 80.0]);
        let out_dir = tempfile::tempdir().unwrap();
        let output = out_dir.path().join("nifty_indicators.csv");

        let ini = with_backtest_keys(&format!("data_dir = {}", data_dir.path().display()));
        let file = write_temp_ini(&ini);

        let code = cli::run(Cli {
            command: Command::Indicators {
                config: file.path().to_path_buf(),
                instrument: "nifty".into(),
                output: output.clone(),
                synthetic: false,
            },
        });

        assert!(exit_status(code).contains("(0)"));
        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "date,time,close,baseline,disparity,fast,slow");
        // five bars, first row once two observations exist
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn synthetic_backtest_runs_without_data_files() {
        let out_dir = tempfile::tempdir().unwrap();
        let ini = r#"
[backtest]
start_date = 2024-01-01
end_date = 2024-01-03
instruments = nifty
source = synthetic
synthetic_seed = 7

[nifty]
symbol = NSEI
"#;
        let file = write_temp_ini(ini);
        let code = cli::run(Cli {
            command: Command::Backtest {
                config: file.path().to_path_buf(),
                instrument: None,
                output_dir: Some(out_dir.path().to_path_buf()),
                synthetic: false,
            },
        });
        assert!(exit_status(code).contains("(0)"));
        assert!(CsvReportAdapter::summary_path(out_dir.path(), "nifty").exists());
    }
}
