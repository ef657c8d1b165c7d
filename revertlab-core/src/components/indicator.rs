//! Indicator trait and precomputed indicator values container.
//!
//! Indicators are pure functions from bar history to a numeric series of the
//! same length. They are computed once per backtest, before the lifecycle
//! loop, and read by bar index afterwards.

use crate::domain::Bar;
use std::collections::HashMap;

/// A pure series transform over bars.
///
/// The output has one value per bar; bars where the value is undefined
/// (warmup, NaN input) hold `f64::NAN`.
pub trait Indicator: Send + Sync {
    /// Key under which the series is stored (e.g. "atr_14", "period_return_30").
    fn name(&self) -> &str;

    /// Index of the first bar that can carry a defined value.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Named indicator series, queried by bar index.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Value at `bar_index`, or `None` when the series is missing or too short.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
    }

    /// Value at `bar_index` when present and finite.
    pub fn finite(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.get(name, bar_index).filter(|v| v.is_finite())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Compute every indicator over `bars`. Duplicate names are computed once.
pub fn precompute_indicators(indicators: &[Box<dyn Indicator>], bars: &[Bar]) -> IndicatorValues {
    let mut values = IndicatorValues::new();
    for ind in indicators {
        if values.contains(ind.name()) {
            continue;
        }
        values.insert(ind.name(), ind.compute(bars));
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, Atr, CandleSizePct};

    #[test]
    fn indicator_values_insert_and_get() {
        let mut iv = IndicatorValues::new();
        iv.insert("atr_3", vec![f64::NAN, 2.0, 2.5]);
        assert!(iv.get("atr_3", 0).unwrap().is_nan());
        assert_eq!(iv.get("atr_3", 1), Some(2.0));
        assert_eq!(iv.get("atr_3", 3), None);
        assert_eq!(iv.get("missing", 0), None);
    }

    #[test]
    fn finite_filters_nan() {
        let mut iv = IndicatorValues::new();
        iv.insert("x", vec![f64::NAN, 1.0]);
        assert_eq!(iv.finite("x", 0), None);
        assert_eq!(iv.finite("x", 1), Some(1.0));
    }

    #[test]
    fn precompute_dedupes_by_name() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0]);
        let inds: Vec<Box<dyn Indicator>> = vec![
            Box::new(Atr::new(2)),
            Box::new(CandleSizePct),
            Box::new(Atr::new(2)),
        ];
        let values = precompute_indicators(&inds, &bars);
        assert_eq!(values.len(), 2);
        assert_eq!(values.get_series("atr_2").map(|s| s.len()), Some(4));
    }
}
