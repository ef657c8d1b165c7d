//! Strategy evaluation — wires composition, engine, and the backtest
//! collaborator into one call per (series, parameter set).
//!
//! The grid optimizer and the walk-forward driver only see the `Evaluate`
//! trait, so tests can substitute evaluators with scripted results.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use revertlab_core::components::{
    build_composition, CompositionError, FilterKind, StopKind, StrategyComposition, StrategyParams,
};
use revertlab_core::domain::{PriceSeries, SeriesError};
use revertlab_core::engine::{run_strategy, EngineError, ExecutionSignals, StrategyRun};

use crate::backtest::{BacktestEngine, BacktestError, PortfolioSettings, PortfolioStats, SignalInput};
use crate::params::ParameterSet;
use crate::portfolio::SignalPortfolio;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("composition error: {0}")]
    Composition(#[from] CompositionError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
    #[error("series error: {0}")]
    Series(#[from] SeriesError),
}

/// One parameter set and the statistics it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub params: ParameterSet,
    pub stats: PortfolioStats,
}

/// Evaluates one parameter set over one price series.
///
/// Implementations must be pure with respect to their inputs: the optimizer
/// calls `evaluate` concurrently from a worker pool.
pub trait Evaluate: Send + Sync {
    fn evaluate(&self, series: &PriceSeries, params: &ParameterSet)
        -> Result<BacktestResult, RunError>;
}

/// Full detail of a single evaluation, for the `run` command.
#[derive(Debug, Clone)]
pub struct DetailedRun {
    pub result: BacktestResult,
    pub run: StrategyRun,
    pub signals: ExecutionSignals,
}

/// The production evaluator: filter + stop policy over base parameters,
/// backtested by a collaborator.
pub struct StrategyEvaluator {
    filter: FilterKind,
    stop: StopKind,
    base: StrategyParams,
    settings: PortfolioSettings,
    engine: Box<dyn BacktestEngine>,
}

impl std::fmt::Debug for StrategyEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyEvaluator")
            .field("filter", &self.filter)
            .field("stop", &self.stop)
            .field("base", &self.base)
            .field("settings", &self.settings)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl StrategyEvaluator {
    pub fn new(
        filter: FilterKind,
        stop: StopKind,
        base: StrategyParams,
        settings: PortfolioSettings,
    ) -> Self {
        Self {
            filter,
            stop,
            base,
            settings,
            engine: Box::new(SignalPortfolio),
        }
    }

    /// Replace the reference portfolio with another collaborator.
    pub fn with_engine(mut self, engine: Box<dyn BacktestEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn settings(&self) -> &PortfolioSettings {
        &self.settings
    }

    /// Resolve `params` over the base parameters and assemble the strategy.
    pub fn composition(&self, params: &ParameterSet) -> Result<StrategyComposition, RunError> {
        let resolved = self.base.with_overrides(params.values())?;
        Ok(build_composition(self.filter, self.stop, &resolved)?)
    }

    /// Evaluate and keep the intermediate engine output.
    pub fn evaluate_detailed(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<DetailedRun, RunError> {
        let composition = self.composition(params)?;
        let run = run_strategy(series, &composition)?;
        let signals = run.execution_signals(series);

        let timestamps: Vec<NaiveDateTime> = series.bars().iter().map(|b| b.timestamp).collect();
        let input = SignalInput {
            timestamps: &timestamps,
            prices: &signals.prices,
            long_entries: &signals.long_entries,
            short_entries: &signals.short_entries,
            long_exits: &signals.long_exits,
            short_exits: &signals.short_exits,
        };
        let stats = self.engine.run(&input, &self.settings)?;

        Ok(DetailedRun {
            result: BacktestResult {
                params: params.clone(),
                stats,
            },
            run,
            signals,
        })
    }
}

impl Evaluate for StrategyEvaluator {
    fn evaluate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<BacktestResult, RunError> {
        self.evaluate_detailed(series, params).map(|d| d.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::generate_synthetic;

    fn evaluator() -> StrategyEvaluator {
        StrategyEvaluator::new(
            FilterKind::Momentum,
            StopKind::AtrTrailing,
            StrategyParams::default(),
            PortfolioSettings::default(),
        )
    }

    #[test]
    fn evaluates_synthetic_series() {
        let series = generate_synthetic(400, 7, Default::default()).unwrap();
        let params: ParameterSet = [("window", 10.0), ("desired_return", 0.005)]
            .into_iter()
            .collect();
        let detailed = evaluator().evaluate_detailed(&series, &params).unwrap();
        assert_eq!(detailed.signals.len(), series.len());
        assert_eq!(detailed.run.timeline.len(), series.len());
        assert_eq!(detailed.result.params, params);
        assert_eq!(detailed.result.stats.start, series.first_timestamp());
        assert_eq!(detailed.result.stats.end, series.last_timestamp());
    }

    #[test]
    fn unknown_parameter_is_a_composition_error() {
        let series = generate_synthetic(50, 1, Default::default()).unwrap();
        let params: ParameterSet = [("lookback", 3.0)].into_iter().collect();
        let err = evaluator().evaluate(&series, &params).unwrap_err();
        assert!(matches!(
            err,
            RunError::Composition(CompositionError::UnknownParameter(_))
        ));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let series = generate_synthetic(300, 11, Default::default()).unwrap();
        let params: ParameterSet = [("window", 15.0)].into_iter().collect();
        let a = evaluator().evaluate(&series, &params).unwrap();
        let b = evaluator().evaluate(&series, &params).unwrap();
        assert_eq!(a, b);
    }
}
