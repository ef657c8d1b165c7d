//! Fixed stop — a constant offset beyond the signal bar's extreme.
//!
//! Long: low[signal bar] - offset. Short: high[signal bar] + offset.
//! The signal bar is the bar before entry; the level never moves afterwards.

use crate::components::indicator::IndicatorValues;
use crate::domain::{Bar, Direction};

use super::{StopError, StopPolicy};

pub const DEFAULT_FIXED_STOP_OFFSET: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct FixedStop {
    pub offset: f64,
}

impl FixedStop {
    pub fn new(offset: f64) -> Self {
        Self { offset }
    }
}

impl Default for FixedStop {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_STOP_OFFSET)
    }
}

impl StopPolicy for FixedStop {
    fn name(&self) -> &str {
        "fixed"
    }

    fn on_entry(
        &self,
        direction: Direction,
        bars: &[Bar],
        bar_index: usize,
        _entry_price: f64,
        _indicators: &IndicatorValues,
    ) -> Result<f64, StopError> {
        let undefined = |reason: String| StopError::Undefined {
            policy: "fixed",
            bar_index,
            reason,
        };
        let signal_bar = bar_index
            .checked_sub(1)
            .and_then(|i| bars.get(i))
            .ok_or_else(|| undefined("no signal bar before entry".into()))?;

        let stop = match direction {
            Direction::Long => signal_bar.low - self.offset,
            Direction::Short => signal_bar.high + self.offset,
            Direction::Flat => return Err(undefined("flat direction has no stop".into())),
        };
        if !stop.is_finite() {
            return Err(undefined("signal bar extreme is not finite".into()));
        }
        Ok(stop)
    }

    fn on_bar(
        &self,
        _direction: Direction,
        _bars: &[Bar],
        _bar_index: usize,
        current_stop: f64,
        _indicators: &IndicatorValues,
    ) -> f64 {
        current_stop
    }
}
