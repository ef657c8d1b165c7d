//! ATR trailing stop.
//!
//! Entry: entry_price -/+ multiplier * ATR[entry bar].
//! While held: close -/+ multiplier * ATR, ratcheted. An undefined ATR
//! while held keeps the current stop.

use crate::components::indicator::IndicatorValues;
use crate::domain::{Bar, Direction};

use super::{ratchet, StopError, StopPolicy};

#[derive(Debug, Clone)]
pub struct AtrTrailingStop {
    /// Must match an `Atr` indicator in the precomputed set.
    pub atr_period: usize,
    pub multiplier: f64,
    indicator_key: String,
}

impl AtrTrailingStop {
    pub fn new(atr_period: usize, multiplier: f64) -> Self {
        assert!(atr_period >= 1, "atr_period must be >= 1");
        assert!(multiplier > 0.0, "multiplier must be positive");
        Self {
            atr_period,
            multiplier,
            indicator_key: format!("atr_{atr_period}"),
        }
    }

    fn offset(&self, direction: Direction, atr: f64) -> f64 {
        -direction.sign() * self.multiplier * atr
    }
}

impl StopPolicy for AtrTrailingStop {
    fn name(&self) -> &str {
        "atr_trailing"
    }

    fn on_entry(
        &self,
        direction: Direction,
        _bars: &[Bar],
        bar_index: usize,
        entry_price: f64,
        indicators: &IndicatorValues,
    ) -> Result<f64, StopError> {
        let atr = indicators
            .finite(&self.indicator_key, bar_index)
            .ok_or_else(|| StopError::Undefined {
                policy: "atr_trailing",
                bar_index,
                reason: format!("{} is undefined", self.indicator_key),
            })?;
        let stop = entry_price + self.offset(direction, atr);
        if !stop.is_finite() {
            return Err(StopError::Undefined {
                policy: "atr_trailing",
                bar_index,
                reason: format!("non-finite entry price {entry_price}"),
            });
        }
        Ok(stop)
    }

    fn on_bar(
        &self,
        direction: Direction,
        bars: &[Bar],
        bar_index: usize,
        current_stop: f64,
        indicators: &IndicatorValues,
    ) -> f64 {
        let (Some(atr), Some(bar)) = (
            indicators.finite(&self.indicator_key, bar_index),
            bars.get(bar_index),
        ) else {
            return current_stop;
        };
        ratchet(
            direction,
            current_stop,
            bar.close + self.offset(direction, atr),
        )
    }
}
