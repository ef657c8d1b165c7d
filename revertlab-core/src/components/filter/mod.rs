//! Signal filters — admit raw pattern flags as tradeable entry signals.
//!
//! A signal at bar i is only acted on at bar i+1; filters themselves may
//! read anything up to and including bar i.

pub mod envelope;
pub mod momentum;

pub use envelope::EnvelopeFilter;
pub use momentum::MomentumFilter;

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

use super::indicator::IndicatorValues;
use super::pattern::PatternFlags;

/// Admitted entry intent at one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub bullish: bool,
    pub bearish: bool,
}

impl Signal {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        !self.bullish && !self.bearish
    }
}

/// Trait for signal filters.
///
/// # Architecture invariant
/// Filters evaluate market conditions only; they never see position state.
pub trait SignalFilter: Send + Sync {
    fn name(&self) -> &str;

    /// Decide which of the bar's pattern flags become signals.
    fn admit(
        &self,
        flags: &PatternFlags,
        bars: &[Bar],
        bar_index: usize,
        indicators: &IndicatorValues,
    ) -> Signal;
}

/// Run a filter over every bar.
pub fn compute_signals(
    filter: &dyn SignalFilter,
    flags: &[PatternFlags],
    bars: &[Bar],
    indicators: &IndicatorValues,
) -> Vec<Signal> {
    flags
        .iter()
        .enumerate()
        .map(|(i, f)| {
            if f.any() {
                filter.admit(f, bars, i, indicators)
            } else {
                Signal::none()
            }
        })
        .collect()
}
