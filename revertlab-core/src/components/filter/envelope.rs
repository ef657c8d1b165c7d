//! Envelope filter — admits a pattern only when the bar pierces the
//! dual-EMA envelope on the pattern's side. No momentum condition.

use crate::components::indicator::IndicatorValues;
use crate::components::pattern::{Band, PatternFlags};
use crate::domain::Bar;
use crate::indicators::envelope::{band_name, EnvelopeBand};

use super::{Signal, SignalFilter};

#[derive(Debug, Clone)]
pub struct EnvelopeFilter {
    pub span: usize,
    pub pct: f64,
    upper_key: String,
    lower_key: String,
}

impl EnvelopeFilter {
    pub fn new(span: usize, pct: f64) -> Self {
        Self {
            span,
            pct,
            upper_key: band_name(span, pct, EnvelopeBand::Upper),
            lower_key: band_name(span, pct, EnvelopeBand::Lower),
        }
    }
}

impl SignalFilter for EnvelopeFilter {
    fn name(&self) -> &str {
        "envelope_filter"
    }

    fn admit(
        &self,
        flags: &PatternFlags,
        bars: &[Bar],
        bar_index: usize,
        indicators: &IndicatorValues,
    ) -> Signal {
        let band = match (
            indicators.finite(&self.upper_key, bar_index),
            indicators.finite(&self.lower_key, bar_index),
        ) {
            (Some(upper), Some(lower)) => Band { upper, lower },
            _ => return Signal::none(),
        };
        let Some(bar) = bars.get(bar_index) else {
            return Signal::none();
        };

        let gated = flags.gated_by(bar, band);
        Signal {
            bullish: gated.bullish(),
            bearish: gated.bearish(),
        }
    }
}
