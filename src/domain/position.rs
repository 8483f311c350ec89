//! Open trade tracking and closed trade records.

use chrono::{NaiveDate, NaiveTime};
use std::fmt;

use crate::domain::strategy::TrailingArm;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExitReason {
    CrossoverSignal,
    AbsoluteStop,
    TrailingStop,
    MarketClose,
}

impl ExitReason {
    pub const ALL: [ExitReason; 4] = [
        ExitReason::CrossoverSignal,
        ExitReason::AbsoluteStop,
        ExitReason::TrailingStop,
        ExitReason::MarketClose,
    ];
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::CrossoverSignal => write!(f, "crossover_signal"),
            ExitReason::AbsoluteStop => write!(f, "absolute_stop"),
            ExitReason::TrailingStop => write!(f, "trailing_stop"),
            ExitReason::MarketClose => write!(f, "market_close"),
        }
    }
}

/// Realized P&L of buying `initial_capital / entry_price` units.
///
/// Every trade is sized from the same fixed capital; gains are not
/// compounded into later trades.
pub fn position_pnl(entry_price: f64, exit_price: f64, initial_capital: f64) -> f64 {
    (exit_price - entry_price) * (initial_capital / entry_price)
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenTrade {
    pub entry_date: NaiveDate,
    pub entry_time: Option<NaiveTime>,
    pub entry_price: f64,
    /// Highest close seen since entry, including the entry bar.
    pub peak_price: f64,
}

impl OpenTrade {
    pub fn new(entry_date: NaiveDate, entry_time: Option<NaiveTime>, entry_price: f64) -> Self {
        OpenTrade {
            entry_date,
            entry_time,
            entry_price,
            peak_price: entry_price,
        }
    }

    /// Price move per unit since entry.
    pub fn price_change(&self, price: f64) -> f64 {
        price - self.entry_price
    }

    pub fn update_peak(&mut self, price: f64) {
        if price > self.peak_price {
            self.peak_price = price;
        }
    }

    /// peak * (1 - pct/100)
    pub fn trail_level(&self, trailing_stop_percent: f64) -> f64 {
        self.peak_price * (1.0 - trailing_stop_percent / 100.0)
    }

    pub fn should_absolute_stop(&self, price: f64, absolute_stop: f64) -> bool {
        if absolute_stop == 0.0 {
            return false;
        }
        self.price_change(price) < -absolute_stop
    }

    /// Checks against the current peak; call [`OpenTrade::update_peak`] first.
    pub fn should_trailing_stop(
        &self,
        price: f64,
        trailing_stop_percent: f64,
        arm: TrailingArm,
    ) -> bool {
        if trailing_stop_percent == 0.0 {
            return false;
        }
        let armed = match arm {
            TrailingArm::Immediate => true,
            TrailingArm::OnProfit => self.price_change(price) > 0.0,
        };
        armed && price < self.trail_level(trailing_stop_percent)
    }

    pub fn close(
        self,
        exit_date: NaiveDate,
        exit_time: Option<NaiveTime>,
        exit_price: f64,
        exit_reason: ExitReason,
        initial_capital: f64,
    ) -> TradeRecord {
        TradeRecord {
            entry_date: self.entry_date,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_date,
            exit_time,
            exit_price,
            exit_reason,
            quantity: initial_capital / self.entry_price,
            pnl: position_pnl(self.entry_price, exit_price, initial_capital),
        }
    }
}

/// A completed round trip. Every field is always populated.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub entry_date: NaiveDate,
    pub entry_time: Option<NaiveTime>,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_time: Option<NaiveTime>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    /// Notional units bought at entry.
    pub quantity: f64,
    pub pnl: f64,
}

impl TradeRecord {
    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}

/// A position still open when the bar sequence ended.
#[derive(Debug, Clone, PartialEq)]
pub struct UnrealizedPosition {
    pub entry_date: NaiveDate,
    pub entry_time: Option<NaiveTime>,
    pub entry_price: f64,
    pub peak_price: f64,
    pub last_date: NaiveDate,
    pub last_time: Option<NaiveTime>,
    pub last_price: f64,
    pub unrealized_pnl: f64,
}

impl UnrealizedPosition {
    pub fn mark(
        trade: &OpenTrade,
        last_date: NaiveDate,
        last_time: Option<NaiveTime>,
        last_price: f64,
        initial_capital: f64,
    ) -> Self {
        UnrealizedPosition {
            entry_date: trade.entry_date,
            entry_time: trade.entry_time,
            entry_price: trade.entry_price,
            peak_price: trade.peak_price,
            last_date,
            last_time,
            last_price,
            unrealized_pnl: position_pnl(trade.entry_price, last_price, initial_capital),
        }
    }
}
