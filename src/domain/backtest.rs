//! Single-instrument backtest: indicator pipeline, signal classification and
//! the Flat/InTrade state machine.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::error::BacktestError;
use crate::domain::indicator::{compute_indicators, IndicatorRow, SkippedBar};
use crate::domain::ledger::Ledger;
use crate::domain::ohlcv::Bar;
use crate::domain::position::{ExitReason, OpenTrade, UnrealizedPosition};
use crate::domain::signal::{classify, Signal};
use crate::domain::strategy::StrategyParameters;

/// Capital every trade is sized from when none is configured.
pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Too few bars to seed the indicators; the ledger is empty.
    InsufficientHistory { bars: usize, required: usize },
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub symbol: String,
    pub ledger: Ledger,
    /// Position still held after the last bar, marked at its close.
    pub open_position: Option<UnrealizedPosition>,
    pub status: RunStatus,
    pub bars_processed: usize,
    pub skipped_bars: Vec<SkippedBar>,
    pub initial_capital: f64,
}

/// Ledger and terminal state produced by [`simulate`].
#[derive(Debug, Clone, Default)]
pub struct Simulation {
    pub ledger: Ledger,
    pub open_position: Option<UnrealizedPosition>,
}

/// Run one instrument end to end.
///
/// An empty bar sequence is [`BacktestError::DataUnavailable`]. Fewer bars
/// than the warm-up requires is not an error: the result carries an empty
/// ledger and [`RunStatus::InsufficientHistory`].
pub fn run_backtest(
    symbol: &str,
    bars: &[Bar],
    params: &StrategyParameters,
    initial_capital: f64,
) -> Result<BacktestResult, BacktestError> {
    if bars.is_empty() {
        return Err(BacktestError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "empty bar sequence".into(),
        });
    }

    info!(symbol, bars = bars.len(), "starting backtest");

    let series = compute_indicators(
        bars,
        params.baseline_window,
        params.fast_period,
        params.slow_period,
    )?;

    if series.rows.is_empty() {
        warn!(
            symbol,
            bars = bars.len(),
            required = series.warmup,
            "insufficient history to seed indicators"
        );
        return Ok(BacktestResult {
            symbol: symbol.to_string(),
            ledger: Ledger::new(),
            open_position: None,
            status: RunStatus::InsufficientHistory {
                bars: bars.len(),
                required: series.warmup,
            },
            bars_processed: 0,
            skipped_bars: series.skipped,
            initial_capital,
        });
    }

    let sim = simulate(&series.rows, params, initial_capital)?;

    info!(
        symbol,
        trades = sim.ledger.len(),
        open = sim.open_position.is_some(),
        skipped = series.skipped.len(),
        "backtest finished"
    );

    Ok(BacktestResult {
        symbol: symbol.to_string(),
        ledger: sim.ledger,
        open_position: sim.open_position,
        status: RunStatus::Completed,
        bars_processed: series.rows.len(),
        skipped_bars: series.skipped,
        initial_capital,
    })
}

/// Replay indicator rows through the position state machine.
///
/// While in a trade each row is checked in order: session gate, absolute
/// stop, trailing stop (after the peak update), crossover exit. The first
/// match closes the trade and the row is not considered for entry.
pub fn simulate(
    rows: &[IndicatorRow],
    params: &StrategyParameters,
    initial_capital: f64,
) -> Result<Simulation, BacktestError> {
    let mut ledger = Ledger::new();
    let mut open: Option<OpenTrade> = None;
    let mut prev: Option<&IndicatorRow> = None;

    for row in rows {
        let in_session = match (params.session, row.time) {
            (Some(session), Some(t)) => session.contains(t),
            _ => true,
        };
        let signal = classify(prev, row, params.entry_threshold, params.crossover);
        prev = Some(row);

        if let Some(mut trade) = open.take() {
            let exit = if !in_session {
                Some(ExitReason::MarketClose)
            } else if trade.should_absolute_stop(row.close, params.absolute_stop) {
                Some(ExitReason::AbsoluteStop)
            } else {
                trade.update_peak(row.close);
                if trade.should_trailing_stop(
                    row.close,
                    params.trailing_stop_percent,
                    params.trailing_arm,
                ) {
                    Some(ExitReason::TrailingStop)
                } else if signal == Signal::ExitEligible {
                    Some(ExitReason::CrossoverSignal)
                } else {
                    None
                }
            };

            match exit {
                Some(reason) => {
                    let record =
                        trade.close(row.date, row.time, row.close, reason, initial_capital);
                    debug!(
                        date = %record.exit_date,
                        price = record.exit_price,
                        %reason,
                        pnl = record.pnl,
                        "exit"
                    );
                    ledger.record(record);
                }
                None => open = Some(trade),
            }
            continue;
        }

        if !in_session || signal != Signal::EntryEligible {
            continue;
        }
        if row.close <= 0.0 {
            return Err(BacktestError::InvalidEntryPrice {
                date: row.date,
                price: row.close,
            });
        }
        debug!(date = %row.date, price = row.close, spread = row.spread(), "entry");
        open = Some(OpenTrade::new(row.date, row.time, row.close));
    }

    let open_position = match (open, rows.last()) {
        (Some(trade), Some(last)) => Some(UnrealizedPosition::mark(
            &trade,
            last.date,
            last.time,
            last.close,
            initial_capital,
        )),
        _ => None,
    };

    Ok(Simulation {
        ledger,
        open_position,
    })
}
