//! Strategy composition — assembles filter, stop policy, and indicators from
//! a flat set of numeric parameters.
//!
//! One composition is built per parameter set; nothing derived from one set
//! is reused by another.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::filter::{EnvelopeFilter, MomentumFilter, SignalFilter};
use super::indicator::Indicator;
use super::stop::{AtrTrailingStop, FixedStop, StopPolicy};
use crate::indicators::{
    Atr, AvgCandleSize, CandleSizePct, Envelope, EnvelopeBand, LogReturn, PeriodReturn,
};

/// Parameter names accepted by `StrategyParams::with_overrides`.
pub const PARAMETER_NAMES: [&str; 7] = [
    "window",
    "desired_return",
    "atr_multiplier",
    "ewm_period",
    "envelope_pct",
    "fixed_stop_offset",
    "atr_period",
];

#[derive(Debug, Error, PartialEq)]
pub enum CompositionError {
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("parameter '{name}' = {value}: {reason}")]
    InvalidParameter {
        name: String,
        value: f64,
        reason: &'static str,
    },
}

// ─── Kinds ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Volatility expansion plus trailing-return threshold.
    #[default]
    Momentum,
    /// Dual-EMA envelope touch.
    Envelope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    #[default]
    AtrTrailing,
    Fixed,
}

// ─── Parameters ─────────────────────────────────────────────────────

/// Every numeric knob of the strategy, fully resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub window: usize,
    pub desired_return: f64,
    pub atr_multiplier: f64,
    pub atr_period: usize,
    pub ewm_period: usize,
    pub envelope_pct: f64,
    pub fixed_stop_offset: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            window: 30,
            desired_return: 0.01,
            atr_multiplier: 5.0,
            atr_period: 14,
            ewm_period: 50,
            envelope_pct: 0.01,
            fixed_stop_offset: 1.0,
        }
    }
}

fn invalid(name: &str, value: f64, reason: &'static str) -> CompositionError {
    CompositionError::InvalidParameter {
        name: name.to_string(),
        value,
        reason,
    }
}

fn as_count(name: &str, value: f64, min: usize) -> Result<usize, CompositionError> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(invalid(name, value, "must be a whole number"));
    }
    if value < min as f64 {
        return Err(invalid(name, value, "below minimum"));
    }
    Ok(value as usize)
}

impl StrategyParams {
    /// Copy of `self` with named values replaced. Names outside
    /// `PARAMETER_NAMES` are rejected.
    pub fn with_overrides(&self, values: &BTreeMap<String, f64>) -> Result<Self, CompositionError> {
        let mut out = self.clone();
        for (name, &value) in values {
            match name.as_str() {
                "window" => out.window = as_count(name, value, 1)?,
                "desired_return" => out.desired_return = value,
                "atr_multiplier" => out.atr_multiplier = value,
                "ewm_period" => out.ewm_period = as_count(name, value, 2)?,
                "envelope_pct" => out.envelope_pct = value,
                "fixed_stop_offset" => out.fixed_stop_offset = value,
                "atr_period" => out.atr_period = as_count(name, value, 1)?,
                other => return Err(CompositionError::UnknownParameter(other.to_string())),
            }
        }
        out.validate()?;
        Ok(out)
    }

    pub fn validate(&self) -> Result<(), CompositionError> {
        if self.window < 1 {
            return Err(invalid("window", self.window as f64, "must be >= 1"));
        }
        if !self.desired_return.is_finite() || self.desired_return < 0.0 {
            return Err(invalid("desired_return", self.desired_return, "must be finite and >= 0"));
        }
        if !self.atr_multiplier.is_finite() || self.atr_multiplier <= 0.0 {
            return Err(invalid("atr_multiplier", self.atr_multiplier, "must be finite and > 0"));
        }
        if self.atr_period < 1 {
            return Err(invalid("atr_period", self.atr_period as f64, "must be >= 1"));
        }
        // alpha = 2 / (span + 1) must lie strictly inside (0, 1).
        if self.ewm_period < 2 {
            return Err(invalid("ewm_period", self.ewm_period as f64, "must be >= 2"));
        }
        if !(self.envelope_pct > 0.0 && self.envelope_pct < 1.0) {
            return Err(invalid("envelope_pct", self.envelope_pct, "must be in (0, 1)"));
        }
        if !self.fixed_stop_offset.is_finite() || self.fixed_stop_offset < 0.0 {
            return Err(invalid("fixed_stop_offset", self.fixed_stop_offset, "must be finite and >= 0"));
        }
        Ok(())
    }
}

// ─── Composition ────────────────────────────────────────────────────

/// A fully assembled strategy: filter, stop policy, and their indicators.
pub struct StrategyComposition {
    pub filter: Box<dyn SignalFilter>,
    pub stop: Box<dyn StopPolicy>,
    pub indicators: Vec<Box<dyn Indicator>>,
    pub params: StrategyParams,
}

impl std::fmt::Debug for StrategyComposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyComposition")
            .field("filter", &self.filter.name())
            .field("stop", &self.stop.name())
            .field(
                "indicators",
                &self.indicators.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field("params", &self.params)
            .finish()
    }
}

/// Build the runtime components for one parameter set.
pub fn build_composition(
    filter: FilterKind,
    stop: StopKind,
    params: &StrategyParams,
) -> Result<StrategyComposition, CompositionError> {
    params.validate()?;

    let mut indicators: Vec<Box<dyn Indicator>> = Vec::new();

    let filter: Box<dyn SignalFilter> = match filter {
        FilterKind::Momentum => {
            indicators.push(Box::new(LogReturn));
            indicators.push(Box::new(PeriodReturn::new(params.window)));
            indicators.push(Box::new(CandleSizePct));
            indicators.push(Box::new(AvgCandleSize::new(params.window)));
            Box::new(MomentumFilter::new(params.window, params.desired_return))
        }
        FilterKind::Envelope => {
            let (span, pct) = (params.ewm_period, params.envelope_pct);
            indicators.push(Box::new(Envelope::new(span, pct, EnvelopeBand::Upper)));
            indicators.push(Box::new(Envelope::new(span, pct, EnvelopeBand::Lower)));
            Box::new(EnvelopeFilter::new(span, pct))
        }
    };

    let stop: Box<dyn StopPolicy> = match stop {
        StopKind::AtrTrailing => {
            indicators.push(Box::new(Atr::new(params.atr_period)));
            Box::new(AtrTrailingStop::new(params.atr_period, params.atr_multiplier))
        }
        StopKind::Fixed => Box::new(FixedStop::new(params.fixed_stop_offset)),
    };

    Ok(StrategyComposition {
        filter,
        stop,
        indicators,
        params: params.clone(),
    })
}
