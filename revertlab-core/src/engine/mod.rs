//! Strategy engine — runs one composition over one price series.
//!
//! Stages, each a pure whole-series mapping:
//! 1. precompute indicators
//! 2. detect pattern flags
//! 3. admit signals through the filter
//! 4. run the lifecycle state machine

pub mod lifecycle;
pub mod timeline;

pub use lifecycle::{run_lifecycle, Phase};
pub use timeline::{ExecutionSignals, Timeline};

use thiserror::Error;

use crate::components::filter::{compute_signals, Signal};
use crate::components::indicator::{precompute_indicators, IndicatorValues};
use crate::components::pattern::{detect_series, PatternError, PatternFlags};
use crate::components::stop::StopError;
use crate::components::StrategyComposition;
use crate::domain::PriceSeries;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<PatternError> for EngineError {
    fn from(e: PatternError) -> Self {
        EngineError::InvalidInput(e.to_string())
    }
}

impl From<StopError> for EngineError {
    fn from(e: StopError) -> Self {
        EngineError::InvalidInput(e.to_string())
    }
}

/// Everything one strategy run derived from the bars.
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub indicators: IndicatorValues,
    pub flags: Vec<PatternFlags>,
    pub signals: Vec<Signal>,
    pub timeline: Timeline,
}

impl StrategyRun {
    pub fn execution_signals(&self, series: &PriceSeries) -> ExecutionSignals {
        self.timeline.execution_signals(series.bars())
    }
}

/// Run the full pipeline for one composition.
pub fn run_strategy(
    series: &PriceSeries,
    composition: &StrategyComposition,
) -> Result<StrategyRun, EngineError> {
    let bars = series.bars();
    let indicators = precompute_indicators(&composition.indicators, bars);
    let flags = detect_series(bars)?;
    let signals = compute_signals(composition.filter.as_ref(), &flags, bars, &indicators);
    let states = run_lifecycle(bars, &signals, composition.stop.as_ref(), &indicators)?;

    Ok(StrategyRun {
        indicators,
        flags,
        signals,
        timeline: Timeline::new(states),
    })
}
