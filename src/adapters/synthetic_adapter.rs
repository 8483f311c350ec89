//! Seeded random-walk bar source for demos and offline runs.
//!
//! Produces 5-minute bars from midnight of the start date through the last
//! slot of the end date: `close = start_price + cumsum(N(0,1) * volatility)`.
//! The same seed and profile always give the same series.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::error::BacktestError;
use crate::domain::instrument::SyntheticProfile;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;

pub const DEFAULT_SEED: u64 = 42;
pub const BAR_INTERVAL_MINUTES: i64 = 5;

pub struct SyntheticAdapter {
    seed: u64,
    profiles: HashMap<String, SyntheticProfile>,
    fallback: SyntheticProfile,
}

impl SyntheticAdapter {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            profiles: HashMap::new(),
            fallback: SyntheticProfile::default(),
        }
    }

    pub fn with_profile(mut self, symbol: &str, profile: SyntheticProfile) -> Self {
        self.profiles.insert(symbol.to_string(), profile);
        self
    }

    fn profile(&self, symbol: &str) -> SyntheticProfile {
        self.profiles.get(symbol).copied().unwrap_or(self.fallback)
    }
}

impl Default for SyntheticAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

/// Standard normal draw via Box-Muller.
fn standard_normal(rng: &mut StdRng) -> f64 {
    // shift to (0, 1] so ln never sees zero
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

impl DataPort for SyntheticAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BacktestError> {
        if end_date < start_date {
            return Ok(Vec::new());
        }

        let profile = self.profile(symbol);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let step = Duration::minutes(BAR_INTERVAL_MINUTES);
        let days = (end_date - start_date).num_days() + 1;
        let periods = (days * 24 * 60 / BAR_INTERVAL_MINUTES) as usize;

        let mut ts = start_date.and_time(NaiveTime::default());
        let mut price = profile.start_price;
        let mut bars = Vec::with_capacity(periods);
        for _ in 0..periods {
            price += standard_normal(&mut rng) * profile.volatility;
            bars.push(Bar::intraday(ts, price));
            ts += step;
        }
        Ok(bars)
    }
}
