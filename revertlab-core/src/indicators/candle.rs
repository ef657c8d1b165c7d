//! Candle size: the high-low range of a bar as a percentage of its low,
//! and its trailing average.

use super::rolling::rolling_mean;
use crate::components::indicator::Indicator;
use crate::domain::Bar;

pub fn candle_sizes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(Bar::range_pct).collect()
}

#[derive(Debug, Clone, Default)]
pub struct CandleSizePct;

impl Indicator for CandleSizePct {
    fn name(&self) -> &str {
        "candle_size_pct"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        candle_sizes(bars)
    }
}

/// Trailing mean of candle size over `window` bars, current bar included.
/// Lookback: window - 1.
#[derive(Debug, Clone)]
pub struct AvgCandleSize {
    window: usize,
    name: String,
}

impl AvgCandleSize {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "AvgCandleSize window must be >= 1");
        Self {
            window,
            name: format!("avg_candle_size_{window}"),
        }
    }
}

impl Indicator for AvgCandleSize {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_mean(&candle_sizes(bars), self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn candle_size_is_range_over_low() {
        let bars = make_ohlc_bars(&[(100.0, 104.0, 100.0, 102.0), (10.0, 11.0, 10.0, 10.5)]);
        let sizes = CandleSizePct.compute(&bars);
        assert_approx(sizes[0], 4.0, DEFAULT_EPSILON);
        assert_approx(sizes[1], 10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn average_includes_current_bar() {
        let bars = make_ohlc_bars(&[
            (100.0, 101.0, 100.0, 100.5), // 1%
            (100.0, 102.0, 100.0, 101.0), // 2%
            (100.0, 106.0, 100.0, 103.0), // 6%
        ]);
        let avg = AvgCandleSize::new(2).compute(&bars);
        assert!(avg[0].is_nan());
        assert_approx(avg[1], 1.5, DEFAULT_EPSILON);
        assert_approx(avg[2], 4.0, DEFAULT_EPSILON);
    }
}
