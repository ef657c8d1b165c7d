//! Log returns and trailing cumulative log return.
//!
//! log_return[t] = ln(close[t] / close[t-1]); log_return[0] is undefined.
//! period_return[t] = sum of the last `window` log returns ending at t.

use super::rolling::rolling_sum;
use crate::components::indicator::Indicator;
use crate::domain::Bar;

/// Per-bar log return of the close.
pub fn log_returns(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut result = vec![f64::NAN; n];
    for i in 1..n {
        result[i] = (bars[i].close / bars[i - 1].close).ln();
    }
    result
}

#[derive(Debug, Clone, Default)]
pub struct LogReturn;

impl Indicator for LogReturn {
    fn name(&self) -> &str {
        "log_return"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        log_returns(bars)
    }
}

/// Cumulative log return over the trailing `window` bars.
/// Lookback: window (log_return[0] is NaN, so the first full window ends at `window`).
#[derive(Debug, Clone)]
pub struct PeriodReturn {
    window: usize,
    name: String,
}

impl PeriodReturn {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "PeriodReturn window must be >= 1");
        Self {
            window,
            name: format!("period_return_{window}"),
        }
    }
}

impl Indicator for PeriodReturn {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_sum(&log_returns(bars), self.window)
    }
}
