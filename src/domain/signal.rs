//! Fast/slow crossover classification.

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::IndicatorRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    None,
    EntryEligible,
    ExitEligible,
}

/// How the fast/slow relationship turns into a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossoverPolicy {
    /// Only the current row is compared; fires on every bar fast stays
    /// above (or below) slow.
    Level,
    /// Fires only on the bar where the relationship flips relative to the
    /// previous row. A row without a predecessor never fires.
    #[default]
    Edge,
}

impl FromStr for CrossoverPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "level" | "simple" => Ok(CrossoverPolicy::Level),
            "edge" | "crossover" => Ok(CrossoverPolicy::Edge),
            other => Err(format!("unknown crossover policy '{}' (expected edge or level)", other)),
        }
    }
}

impl fmt::Display for CrossoverPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossoverPolicy::Level => write!(f, "level"),
            CrossoverPolicy::Edge => write!(f, "edge"),
        }
    }
}

/// Classify `current` given the row before it.
///
/// Entry needs fast > slow with a spread of at least `threshold`; exit needs
/// fast < slow. fast == slow is always `Signal::None`.
pub fn classify(
    prev: Option<&IndicatorRow>,
    current: &IndicatorRow,
    threshold: f64,
    policy: CrossoverPolicy,
) -> Signal {
    let bullish = current.fast > current.slow;
    let bearish = current.fast < current.slow;

    let (crossed_up, crossed_down) = match policy {
        CrossoverPolicy::Level => (bullish, bearish),
        CrossoverPolicy::Edge => match prev {
            Some(p) => (
                bullish && p.fast <= p.slow,
                bearish && p.fast >= p.slow,
            ),
            None => (false, false),
        },
    };

    if crossed_up && current.spread() >= threshold {
        Signal::EntryEligible
    } else if crossed_down {
        Signal::ExitEligible
    } else {
        Signal::None
    }
}
