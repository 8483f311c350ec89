//! Performance aggregation over a trade ledger.
//!
//! Every figure is a pure reduction over closed trades. Daily and monthly
//! buckets key off the exit date, where P&L is realized.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;

use super::backtest::BacktestResult;
use super::position::{ExitReason, TradeRecord, UnrealizedPosition};

/// Calendar month bucket, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub initial_capital: f64,
    pub total_pnl: f64,
    pub total_return_pct: f64,
    pub trade_count: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub breakeven_count: usize,
    pub win_rate_pct: f64,
    pub avg_win: f64,
    /// Positive magnitude.
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Positive magnitude.
    pub largest_loss: f64,
    pub profit_factor: f64,
    pub avg_holding_days: f64,
    pub exit_reasons: BTreeMap<ExitReason, usize>,
    pub daily_pnl: BTreeMap<NaiveDate, f64>,
    pub monthly_pnl: BTreeMap<YearMonth, f64>,
    /// Open position of a single-instrument run.
    pub unrealized: Option<UnrealizedPosition>,
    /// Mark-to-market P&L of every open position covered by this summary.
    pub unrealized_pnl: f64,
}

impl PerformanceSummary {
    pub fn from_trades<'a, I>(trades: I, initial_capital: f64) -> Self
    where
        I: IntoIterator<Item = &'a TradeRecord>,
    {
        let mut total_pnl = 0.0_f64;
        let mut win_count = 0usize;
        let mut loss_count = 0usize;
        let mut breakeven_count = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_holding_days = 0i64;
        let mut exit_reasons = BTreeMap::new();
        let mut daily_pnl = BTreeMap::new();
        let mut monthly_pnl = BTreeMap::new();

        for trade in trades {
            let pnl = trade.pnl;
            total_pnl += pnl;
            if pnl > 0.0 {
                win_count += 1;
                total_wins += pnl;
                if pnl > largest_win {
                    largest_win = pnl;
                }
            } else if pnl < 0.0 {
                loss_count += 1;
                total_losses += pnl.abs();
                if pnl.abs() > largest_loss {
                    largest_loss = pnl.abs();
                }
            } else {
                breakeven_count += 1;
            }

            total_holding_days += trade.holding_days();
            *exit_reasons.entry(trade.exit_reason).or_insert(0) += 1;
            *daily_pnl.entry(trade.exit_date).or_insert(0.0) += pnl;
            *monthly_pnl
                .entry(YearMonth::from(trade.exit_date))
                .or_insert(0.0) += pnl;
        }

        let trade_count = win_count + loss_count + breakeven_count;
        let win_rate_pct = if trade_count > 0 {
            win_count as f64 / trade_count as f64 * 100.0
        } else {
            0.0
        };

        let total_return_pct = if initial_capital > 0.0 {
            total_pnl / initial_capital * 100.0
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if win_count > 0 {
            total_wins / win_count as f64
        } else {
            0.0
        };

        let avg_loss = if loss_count > 0 {
            total_losses / loss_count as f64
        } else {
            0.0
        };

        let avg_holding_days = if trade_count > 0 {
            total_holding_days as f64 / trade_count as f64
        } else {
            0.0
        };

        PerformanceSummary {
            initial_capital,
            total_pnl,
            total_return_pct,
            trade_count,
            win_count,
            loss_count,
            breakeven_count,
            win_rate_pct,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            profit_factor,
            avg_holding_days,
            exit_reasons,
            daily_pnl,
            monthly_pnl,
            unrealized: None,
            unrealized_pnl: 0.0,
        }
    }

    pub fn exit_count(&self, reason: ExitReason) -> usize {
        self.exit_reasons.get(&reason).copied().unwrap_or(0)
    }
}

pub fn summarize(result: &BacktestResult) -> PerformanceSummary {
    let mut summary = PerformanceSummary::from_trades(&result.ledger, result.initial_capital);
    summary.unrealized_pnl = result
        .open_position
        .as_ref()
        .map(|p| p.unrealized_pnl)
        .unwrap_or(0.0);
    summary.unrealized = result.open_position.clone();
    summary
}

/// One summary across independent runs.
///
/// Total return is measured against the sum of each run's capital.
pub fn summarize_combined(results: &[&BacktestResult]) -> PerformanceSummary {
    let capital: f64 = results.iter().map(|r| r.initial_capital).sum();
    let mut summary =
        PerformanceSummary::from_trades(results.iter().flat_map(|r| r.ledger.iter()), capital);
    summary.unrealized_pnl = results
        .iter()
        .filter_map(|r| r.open_position.as_ref())
        .map(|p| p.unrealized_pnl)
        .sum();
    summary
}
