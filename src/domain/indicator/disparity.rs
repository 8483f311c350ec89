//! Disparity Index: percentage deviation of close from its baseline.

use crate::domain::error::DomainError;

/// (close - baseline) / baseline * 100
pub fn disparity(close: f64, baseline: f64) -> Result<f64, DomainError> {
    if baseline == 0.0 {
        return Err(DomainError::ZeroBaseline { close });
    }
    Ok((close - baseline) / baseline * 100.0)
}
