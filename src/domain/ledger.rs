//! Append-only trade ledger for one backtest run.

use super::position::TradeRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    trades: Vec<TradeRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger { trades: Vec::new() }
    }

    pub(crate) fn record(&mut self, trade: TradeRecord) {
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TradeRecord> {
        self.trades.iter()
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a TradeRecord;
    type IntoIter = std::slice::Iter<'a, TradeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ExitReason, OpenTrade};
    use chrono::NaiveDate;

    fn trade(day: u32, exit: f64) -> TradeRecord {
        let d = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        OpenTrade::new(d, None, 100.0).close(d, None, exit, ExitReason::CrossoverSignal, 100_000.0)
    }

    #[test]
    fn new_ledger_is_empty() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
        assert!(ledger.trades().is_empty());
    }

    #[test]
    fn record_appends_in_order() {
        let mut ledger = Ledger::new();
        ledger.record(trade(2, 110.0));
        ledger.record(trade(5, 90.0));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.trades()[0].exit_price, 110.0);
        assert_eq!(ledger.trades()[1].exit_price, 90.0);
        let exits: Vec<f64> = ledger.iter().map(|t| t.exit_price).collect();
        assert_eq!(exits, vec![110.0, 90.0]);
    }

    #[test]
    fn iterates_by_reference() {
        let mut ledger = Ledger::new();
        ledger.record(trade(2, 110.0));
        let total: f64 = (&ledger).into_iter().map(|t| t.pnl).sum();
        assert!((total - 10_000.0).abs() < 1e-9);
    }
}
