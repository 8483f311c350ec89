//! Strategy parameters for one instrument.

use chrono::NaiveTime;
use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::warmup_bars;
use crate::domain::signal::CrossoverPolicy;

/// When the trailing stop starts protecting a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingArm {
    /// From the entry bar onwards.
    #[default]
    Immediate,
    /// Only on bars where close is above the entry price. Arming is decided
    /// per bar and never latches: a bar that gaps below entry is not
    /// checked, however far it sits under the trail level.
    OnProfit,
}

impl FromStr for TrailingArm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" => Ok(TrailingArm::Immediate),
            "on_profit" | "profit" => Ok(TrailingArm::OnProfit),
            other => Err(format!(
                "unknown trailing arm '{}' (expected immediate or on_profit)",
                other
            )),
        }
    }
}

impl fmt::Display for TrailingArm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrailingArm::Immediate => write!(f, "immediate"),
            TrailingArm::OnProfit => write!(f, "on_profit"),
        }
    }
}

/// Inclusive trading session for intraday bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl SessionWindow {
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.open <= time && time <= self.close
    }
}

impl Default for SessionWindow {
    /// 09:15 - 15:30, the NSE cash session.
    fn default() -> Self {
        SessionWindow {
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParameters {
    pub baseline_window: usize,
    pub fast_period: usize,
    pub slow_period: usize,
    /// Minimum fast - slow spread to arm an entry.
    pub entry_threshold: f64,
    /// Maximum adverse price move per trade; 0 disables.
    pub absolute_stop: f64,
    /// Retreat from the running peak, in percent; 0 disables.
    pub trailing_stop_percent: f64,
    pub crossover: CrossoverPolicy,
    pub trailing_arm: TrailingArm,
    /// Applied only to bars carrying a time-of-day.
    pub session: Option<SessionWindow>,
}

impl StrategyParameters {
    pub fn warmup_bars(&self) -> usize {
        warmup_bars(self.baseline_window, self.fast_period, self.slow_period)
    }
}

impl Default for StrategyParameters {
    fn default() -> Self {
        StrategyParameters {
            baseline_window: 20,
            fast_period: 3,
            slow_period: 6,
            entry_threshold: 1.5,
            absolute_stop: 600.0,
            trailing_stop_percent: 0.5,
            crossover: CrossoverPolicy::Edge,
            trailing_arm: TrailingArm::Immediate,
            session: Some(SessionWindow::default()),
        }
    }
}
