//! Two-bar reversal candle patterns.
//!
//! Each flag at bar i is a pure function of bars i-1 and i. Bar 0 has no
//! predecessor and never carries a flag.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Share of the prior bar's close-to-extreme distance a hammer's wick must
/// exceed.
pub const HAMMER_WICK_RATIO: f64 = 0.9;

#[derive(Debug, Error, PartialEq)]
pub enum PatternError {
    #[error("invalid input: pattern detection needs at least 2 bars, got {0}")]
    InvalidInput(usize),
}

/// Raw pattern classification of one bar against its predecessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFlags {
    pub engulfing_bull: bool,
    pub engulfing_bear: bool,
    pub hammer_bull: bool,
    pub hammer_bear: bool,
}

impl PatternFlags {
    pub fn bullish(&self) -> bool {
        self.engulfing_bull || self.hammer_bull
    }

    pub fn bearish(&self) -> bool {
        self.engulfing_bear || self.hammer_bear
    }

    pub fn any(&self) -> bool {
        self.bullish() || self.bearish()
    }

    /// Keep bullish flags only when the bar's low touched the lower band and
    /// bearish flags only when its high touched the upper band.
    pub fn gated_by(self, curr: &Bar, band: Band) -> Self {
        let bull_touch = curr.low <= band.lower;
        let bear_touch = curr.high >= band.upper;
        Self {
            engulfing_bull: self.engulfing_bull && bull_touch,
            hammer_bull: self.hammer_bull && bull_touch,
            engulfing_bear: self.engulfing_bear && bear_touch,
            hammer_bear: self.hammer_bear && bear_touch,
        }
    }
}

/// Envelope band at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub upper: f64,
    pub lower: f64,
}

/// Classify `curr` against `prev`.
pub fn classify(prev: &Bar, curr: &Bar) -> PatternFlags {
    let engulfing_bull = prev.open < curr.close && curr.is_bullish() && prev.is_bearish();
    let engulfing_bear = prev.open > curr.close && curr.is_bearish() && prev.is_bullish();

    let hammer_bull = curr.is_bullish()
        && prev.is_bullish()
        && (curr.open - curr.low) > HAMMER_WICK_RATIO * (prev.close - prev.low);
    let hammer_bear = curr.is_bearish()
        && prev.is_bearish()
        && (curr.high - curr.open) > HAMMER_WICK_RATIO * (prev.high - prev.close);

    PatternFlags {
        engulfing_bull,
        engulfing_bear,
        hammer_bull,
        hammer_bear,
    }
}

/// Classify the last bar of `window` against the bar before it, optionally
/// gated by an envelope band at that bar.
pub fn detect(window: &[Bar], band: Option<Band>) -> Result<PatternFlags, PatternError> {
    let n = window.len();
    if n < 2 {
        return Err(PatternError::InvalidInput(n));
    }
    let curr = &window[n - 1];
    let flags = classify(&window[n - 2], curr);
    Ok(match band {
        Some(band) => flags.gated_by(curr, band),
        None => flags,
    })
}

/// Ungated flags for every bar of the series.
pub fn detect_series(bars: &[Bar]) -> Result<Vec<PatternFlags>, PatternError> {
    if bars.len() < 2 {
        return Err(PatternError::InvalidInput(bars.len()));
    }
    let mut flags = Vec::with_capacity(bars.len());
    flags.push(PatternFlags::default());
    flags.extend(bars.windows(2).map(|w| classify(&w[0], &w[1])));
    Ok(flags)
}
