//! Dual-EMA envelope.
//!
//! Two EMAs of the close with spans `p` and `2p`. The short EMA is the
//! reference; the band is asymmetric, wider on the side the long EMA lags:
//! - short > long: upper = s * (1 + pct), lower = s * (1 - pct / 2)
//! - otherwise:    upper = s * (1 + pct / 2), lower = s * (1 - pct)

use super::ema::ema_of_series;
use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    span: usize,
    pct: f64,
    band: EnvelopeBand,
    name: String,
}

impl Envelope {
    pub fn new(span: usize, pct: f64, band: EnvelopeBand) -> Self {
        assert!(span >= 1, "envelope span must be >= 1");
        Self {
            span,
            pct,
            band,
            name: band_name(span, pct, band),
        }
    }
}

/// Indicator key for one envelope band.
pub fn band_name(span: usize, pct: f64, band: EnvelopeBand) -> String {
    match band {
        EnvelopeBand::Upper => format!("envelope_upper_{span}_{pct}"),
        EnvelopeBand::Lower => format!("envelope_lower_{span}_{pct}"),
    }
}

/// Compute both bands at once.
pub fn envelope_bands(bars: &[Bar], span: usize, pct: f64) -> (Vec<f64>, Vec<f64>) {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let short = ema_of_series(&closes, span);
    let long = ema_of_series(&closes, span * 2);

    short
        .iter()
        .zip(&long)
        .map(|(&s, &l)| {
            if s > l {
                (s * (1.0 + pct), s * (1.0 - pct / 2.0))
            } else {
                (s * (1.0 + pct / 2.0), s * (1.0 - pct))
            }
        })
        .unzip()
}

impl Indicator for Envelope {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let (upper, lower) = envelope_bands(bars, self.span, self.pct);
        match self.band {
            EnvelopeBand::Upper => upper,
            EnvelopeBand::Lower => lower,
        }
    }
}
