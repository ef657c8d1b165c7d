//! Grid search over one price series.
//!
//! Every parameter set is evaluated independently on a fixed-size rayon
//! pool. The pool is drained before ranking: a partial grid is never ranked.
//! A failing or panicking evaluation becomes a `CombinationFailure` tagged
//! with its parameter set; the rest of the grid still completes.

use std::cmp::Ordering;
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use revertlab_core::domain::PriceSeries;

use crate::params::ParameterSet;
use crate::runner::{BacktestResult, Evaluate};

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A parameter set whose evaluation failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationFailure {
    pub params: ParameterSet,
    pub reason: String,
}

/// Everything one grid search produced, already ranked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridOutcome {
    /// Admissible results, best first.
    pub ranked: Vec<BacktestResult>,
    /// Results dropped for producing no trades.
    pub zero_trade: usize,
    pub failures: Vec<CombinationFailure>,
}

impl GridOutcome {
    pub fn evaluated(&self) -> usize {
        self.ranked.len() + self.zero_trade + self.failures.len()
    }

    pub fn best(&self) -> Option<&BacktestResult> {
        self.ranked.first()
    }
}

pub struct GridSearchOptimizer {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl std::fmt::Debug for GridSearchOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridSearchOptimizer")
            .field("workers", &self.workers)
            .finish()
    }
}

/// Hardware concurrency, falling back to one worker when unknown.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

impl GridSearchOptimizer {
    /// Pool of `workers` threads, or hardware concurrency when `None`.
    pub fn new(workers: Option<usize>) -> Result<Self, OptimizerError> {
        let workers = workers.unwrap_or_else(default_workers);
        if workers == 0 {
            return Err(OptimizerError::NoWorkers);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("grid-worker-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Evaluate every combination on `series` and rank the admissible ones.
    pub fn search(
        &self,
        evaluator: &dyn Evaluate,
        series: &PriceSeries,
        combinations: &[ParameterSet],
    ) -> GridOutcome {
        let evaluated: Vec<Result<BacktestResult, CombinationFailure>> = self.pool.install(|| {
            combinations
                .par_iter()
                .map(|params| {
                    evaluate_guarded(evaluator, series, params).map_err(|reason| {
                        CombinationFailure {
                            params: params.clone(),
                            reason,
                        }
                    })
                })
                .collect()
        });

        let mut results = Vec::with_capacity(evaluated.len());
        let mut failures = Vec::new();
        for item in evaluated {
            match item {
                Ok(r) => results.push(r),
                Err(f) => {
                    warn!(params = %f.params, reason = %f.reason, "combination failed");
                    failures.push(f);
                }
            }
        }

        let (ranked, zero_trade) = rank(results);
        debug!(
            ranked = ranked.len(),
            zero_trade,
            failed = failures.len(),
            "grid drained"
        );
        GridOutcome {
            ranked,
            zero_trade,
            failures,
        }
    }
}

/// Run one evaluation, turning errors and panics into a reason string.
pub(crate) fn evaluate_guarded(
    evaluator: &dyn Evaluate,
    series: &PriceSeries,
    params: &ParameterSet,
) -> Result<BacktestResult, String> {
    match catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(series, params))) {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

// ─── Ranking ────────────────────────────────────────────────────────

/// Drop zero-trade results, then sort by (sharpe, sortino, calmar, total
/// return), all descending. The sort is stable, so exact ties keep their
/// grid order. Returns the ranked list and the number dropped.
pub fn rank(results: Vec<BacktestResult>) -> (Vec<BacktestResult>, usize) {
    let before = results.len();
    let mut ranked: Vec<BacktestResult> = results
        .into_iter()
        .filter(|r| r.stats.total_trades > 0)
        .collect();
    let zero_trade = before - ranked.len();
    ranked.sort_by(compare_results);
    (ranked, zero_trade)
}

/// Ranking order: `Less` means `a` ranks ahead of `b`.
pub fn compare_results(a: &BacktestResult, b: &BacktestResult) -> Ordering {
    let (x, y) = (&a.stats, &b.stats);
    cmp_desc(x.sharpe, y.sharpe)
        .then_with(|| cmp_desc(x.sortino, y.sortino))
        .then_with(|| cmp_desc(x.calmar, y.calmar))
        .then_with(|| cmp_desc(x.total_return_pct, y.total_return_pct))
}

/// Descending order with NaN last.
fn cmp_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
