//! Instrument list parsing and per-instrument settings.
//!
//! Each configured instrument is an independent run with its own
//! parameters; nothing is shared between runs.

use std::collections::HashSet;

use crate::domain::strategy::StrategyParameters;

/// Walk parameters for the synthetic bar source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticProfile {
    pub start_price: f64,
    pub volatility: f64,
}

impl Default for SyntheticProfile {
    fn default() -> Self {
        SyntheticProfile {
            start_price: 19_500.0,
            volatility: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentConfig {
    /// Config section name; also the report file prefix.
    pub name: String,
    /// Symbol passed to the data source.
    pub symbol: String,
    pub params: StrategyParameters,
    pub synthetic: SyntheticProfile,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum InstrumentError {
    #[error("empty token in instrument list")]
    EmptyToken,

    #[error("duplicate instrument: {0}")]
    Duplicate(String),
}

/// Split a comma-separated instrument list into lowercase section names.
pub fn parse_instruments(input: &str) -> Result<Vec<String>, InstrumentError> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(InstrumentError::EmptyToken);
        }
        let name = trimmed.to_lowercase();
        if !seen.insert(name.clone()) {
            return Err(InstrumentError::Duplicate(name));
        }
        names.push(name);
    }

    Ok(names)
}
