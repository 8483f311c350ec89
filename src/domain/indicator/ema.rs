//! Exponential smoothing without bias adjustment.
//!
//! alpha = 2/(span+1), seeded with the first observation, then
//! y[i] = alpha*x[i] + (1-alpha)*y[i-1]. Weights are never renormalised for
//! the finite history, so the recursion is a strict left-to-right fold.

#[derive(Debug, Clone, PartialEq)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        Ema {
            alpha: smoothing_factor(span),
            value: None,
        }
    }

    /// Fold one observation into the average and return the new value.
    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            None => x,
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
        };
        self.value = Some(next);
        next
    }
}

pub fn smoothing_factor(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}
