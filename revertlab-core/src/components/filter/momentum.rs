//! Momentum filter — trust a reversal only after a volatile directional run.
//!
//! Admits a bullish flag when the bar's candle size exceeds 1.5x its trailing
//! average and the trailing cumulative log return is at or below
//! -desired_return. Bearish mirrors with >= +desired_return.
//! Any undefined input at the bar rejects both sides.

use crate::components::indicator::IndicatorValues;
use crate::components::pattern::PatternFlags;
use crate::domain::Bar;

use super::{Signal, SignalFilter};

/// Candle size must exceed this multiple of its trailing average.
pub const VOLATILITY_EXPANSION: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct MomentumFilter {
    pub window: usize,
    pub desired_return: f64,
    avg_size_key: String,
    period_return_key: String,
}

impl MomentumFilter {
    pub fn new(window: usize, desired_return: f64) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self {
            window,
            desired_return,
            avg_size_key: format!("avg_candle_size_{window}"),
            period_return_key: format!("period_return_{window}"),
        }
    }
}

impl SignalFilter for MomentumFilter {
    fn name(&self) -> &str {
        "momentum_filter"
    }

    fn admit(
        &self,
        flags: &PatternFlags,
        _bars: &[Bar],
        bar_index: usize,
        indicators: &IndicatorValues,
    ) -> Signal {
        let (size, avg, ret) = match (
            indicators.finite("candle_size_pct", bar_index),
            indicators.finite(&self.avg_size_key, bar_index),
            indicators.finite(&self.period_return_key, bar_index),
        ) {
            (Some(s), Some(a), Some(r)) => (s, a, r),
            _ => return Signal::none(),
        };

        let expanding = size > VOLATILITY_EXPANSION * avg;
        Signal {
            bullish: flags.bullish() && expanding && ret <= -self.desired_return,
            bearish: flags.bearish() && expanding && ret >= self.desired_return,
        }
    }
}
