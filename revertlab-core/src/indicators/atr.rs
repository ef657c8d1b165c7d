//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), defined
//! from bar 1 onward. Seed: mean of TR[1..=period]. Smoothing from bar
//! period+1: ATR[t] = (ATR[t-1] * (period - 1) + TR[t]) / period.
//!
//! The seed is also written back over bars 1..period, so those bars carry an
//! average that includes TR values from later bars in the seed window. This
//! warmup region is the only place an indicator here looks past bar t.
//! Lookback: 1.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

pub const DEFAULT_ATR_PERIOD: usize = 14;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Default for Atr {
    fn default() -> Self {
        Self::new(DEFAULT_ATR_PERIOD)
    }
}

/// True Range series. TR[0] is NaN (no previous close).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }

    tr
}

/// Seeded Wilder average over a TR series whose first defined value is at index 1.
pub fn seeded_wilder(tr: &[f64], period: usize) -> Vec<f64> {
    let n = tr.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period + 1 {
        return result;
    }

    let seed_window = &tr[1..=period];
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }
    let seed = seed_window.iter().sum::<f64>() / period as f64;
    for val in &mut result[1..=period] {
        *val = seed;
    }

    let weight = (period - 1) as f64;
    let mut prev = seed;
    for i in (period + 1)..n {
        if tr[i].is_nan() {
            // Once TR breaks, everything after is tainted.
            return result;
        }
        prev = (prev * weight + tr[i]) / period as f64;
        result[i] = prev;
    }

    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        seeded_wilder(&true_range(bars), self.period)
    }
}
