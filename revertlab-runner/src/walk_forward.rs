//! Walk-forward optimization — rolling in-sample/out-of-sample windows.
//!
//! The series is cut into N windows of equal width W, each an in-sample (IS)
//! segment followed directly by an out-of-sample (OOS) segment. Consecutive
//! windows advance by one OOS length, so the OOS segments tile the tail of
//! the series with no gap and no overlap:
//!
//! ```text
//! W       = total / (f + N·(1 − f))
//! is_len  = ⌊W·f⌋,  oos_len = ⌊W·(1 − f)⌋
//! IS_i    = [i·oos_len, i·oos_len + is_len)
//! OOS_i   = [IS_i.end, IS_i.end + oos_len)      (last OOS runs to total)
//! ```
//!
//! For each window the grid is searched on IS, one parameter set is selected,
//! and that set alone is re-run on OOS. Windows run in index order.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use revertlab_core::domain::{PriceSeries, SeriesError};

use crate::backtest::PortfolioStats;
use crate::grid::{evaluate_guarded, CombinationFailure, GridSearchOptimizer};
use crate::params::{ParamGrid, ParameterSet};
use crate::runner::{BacktestResult, Evaluate, SCHEMA_VERSION};
use crate::selection::{SelectionError, Selector};

/// Shortest IS or OOS segment a split may produce.
pub const MIN_SEGMENT_BARS: usize = 2;

/// Slack for float error in the floor operations.
const FLOOR_EPSILON: f64 = 1e-9;

// ─── Splits ─────────────────────────────────────────────────────────

/// Bar index ranges of one window. Ends are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSplit {
    pub window_index: usize,
    pub is_start: usize,
    pub is_end: usize,
    pub oos_start: usize,
    pub oos_end: usize,
}

impl WindowSplit {
    pub fn is_len(&self) -> usize {
        self.is_end - self.is_start
    }

    pub fn oos_len(&self) -> usize {
        self.oos_end - self.oos_start
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("in-sample fraction must be strictly between 0 and 1, got {0}")]
    InvalidFraction(f64),
    #[error("window count must be at least 1")]
    NoWindows,
    #[error(
        "{total_bars} bars cannot hold {windows} windows: in-sample {is_len}, out-of-sample {oos_len} (minimum {MIN_SEGMENT_BARS})"
    )]
    TooShort {
        total_bars: usize,
        windows: usize,
        is_len: usize,
        oos_len: usize,
    },
}

/// Compute the N rolling windows over `total_bars`.
pub fn split_windows(
    total_bars: usize,
    in_sample_fraction: f64,
    windows: usize,
) -> Result<Vec<WindowSplit>, SplitError> {
    let f = in_sample_fraction;
    if !(f.is_finite() && f > 0.0 && f < 1.0) {
        return Err(SplitError::InvalidFraction(f));
    }
    if windows == 0 {
        return Err(SplitError::NoWindows);
    }

    let width = total_bars as f64 / (f + windows as f64 * (1.0 - f));
    let is_len = (width * f + FLOOR_EPSILON).floor() as usize;
    let oos_len = (width * (1.0 - f) + FLOOR_EPSILON).floor() as usize;
    if is_len < MIN_SEGMENT_BARS || oos_len < MIN_SEGMENT_BARS {
        return Err(SplitError::TooShort {
            total_bars,
            windows,
            is_len,
            oos_len,
        });
    }

    Ok((0..windows)
        .map(|i| {
            let is_start = i * oos_len;
            let is_end = is_start + is_len;
            let oos_end = if i + 1 == windows {
                total_bars
            } else {
                is_end + oos_len
            };
            WindowSplit {
                window_index: i,
                is_start,
                is_end,
                oos_start: is_end,
                oos_end,
            }
        })
        .collect())
}

// ─── Report types ───────────────────────────────────────────────────

/// What became of one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WindowOutcome {
    Validated {
        chosen: ParameterSet,
        out_of_sample: PortfolioStats,
    },
    /// Every in-sample combination failed or traded nothing.
    NoAdmissibleParameters,
    /// The chosen set could not be evaluated out of sample.
    ValidationFailed { chosen: ParameterSet, reason: String },
}

impl WindowOutcome {
    pub fn chosen(&self) -> Option<&ParameterSet> {
        match self {
            WindowOutcome::Validated { chosen, .. } | WindowOutcome::ValidationFailed { chosen, .. } => {
                Some(chosen)
            }
            WindowOutcome::NoAdmissibleParameters => None,
        }
    }

    pub fn out_of_sample(&self) -> Option<&PortfolioStats> {
        match self {
            WindowOutcome::Validated { out_of_sample, .. } => Some(out_of_sample),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    pub split: WindowSplit,
    /// Best in-sample results, best first.
    pub shortlist: Vec<BacktestResult>,
    pub evaluated: usize,
    pub zero_trade: usize,
    pub failures: Vec<CombinationFailure>,
    pub outcome: WindowOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WfoReport {
    pub schema_version: u32,
    pub run_id: String,
    pub dataset_hash: String,
    pub bar_count: usize,
    pub windows: Vec<WindowReport>,
}

impl WfoReport {
    pub fn validated(&self) -> impl Iterator<Item = (&WindowReport, &ParameterSet, &PortfolioStats)> {
        self.windows.iter().filter_map(|w| match &w.outcome {
            WindowOutcome::Validated {
                chosen,
                out_of_sample,
            } => Some((w, chosen, out_of_sample)),
            _ => None,
        })
    }
}

// ─── Driver ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardOptions {
    pub in_sample_fraction: f64,
    pub windows: usize,
    /// Number of in-sample results kept per window report.
    pub shortlist: usize,
}

impl Default for WalkForwardOptions {
    fn default() -> Self {
        Self {
            in_sample_fraction: 0.8,
            windows: 16,
            shortlist: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("split error: {0}")]
    Split(#[from] SplitError),
    #[error("series error: {0}")]
    Series(#[from] SeriesError),
    #[error("selection failed in window {window}: {source}")]
    Selection {
        window: usize,
        #[source]
        source: SelectionError,
    },
}

/// Deterministic id over the dataset, grid, and options.
pub fn run_id(dataset_hash: &str, grid: &ParamGrid, options: &WalkForwardOptions) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(dataset_hash.as_bytes());
    for name in grid.names() {
        hasher.update(name.as_bytes());
        for v in grid.axis(name).unwrap_or_default() {
            hasher.update(&v.to_le_bytes());
        }
    }
    hasher.update(&options.in_sample_fraction.to_le_bytes());
    hasher.update(&(options.windows as u64).to_le_bytes());
    hasher.update(&(options.shortlist as u64).to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Run walk-forward optimization over `series`.
pub fn run_walk_forward(
    series: &PriceSeries,
    grid: &ParamGrid,
    evaluator: &dyn Evaluate,
    optimizer: &GridSearchOptimizer,
    selector: &mut dyn Selector,
    options: &WalkForwardOptions,
) -> Result<WfoReport, WalkForwardError> {
    let splits = split_windows(series.len(), options.in_sample_fraction, options.windows)?;
    let combinations = grid.combinations();
    let dataset_hash = series.dataset_hash();

    info!(
        bars = series.len(),
        windows = splits.len(),
        combinations = combinations.len(),
        workers = optimizer.workers(),
        "walk-forward start"
    );

    let mut windows = Vec::with_capacity(splits.len());
    for split in splits {
        let n = split.window_index + 1;
        info!(
            window = n,
            is = ?(split.is_start..split.is_end),
            oos = ?(split.oos_start..split.oos_end),
            "window start"
        );

        let in_sample = series.slice(split.is_start, split.is_end)?;
        let grid_outcome = optimizer.search(evaluator, &in_sample, &combinations);
        info!(
            window = n,
            evaluated = grid_outcome.evaluated(),
            admissible = grid_outcome.ranked.len(),
            zero_trade = grid_outcome.zero_trade,
            failed = grid_outcome.failures.len(),
            "grid complete"
        );

        let outcome = match grid_outcome.best() {
            None => {
                warn!(window = n, "no admissible parameter set");
                WindowOutcome::NoAdmissibleParameters
            }
            Some(best) => {
                info!(window = n, is_sharpe = best.stats.sharpe, "in-sample best");
                let chosen = selector
                    .select(split.window_index, &grid_outcome.ranked, grid)
                    .map_err(|source| WalkForwardError::Selection {
                        window: split.window_index,
                        source,
                    })?;
                info!(window = n, chosen = %chosen, "parameters chosen");

                let out_of_sample = series.slice(split.oos_start, split.oos_end)?;
                match evaluate_guarded(evaluator, &out_of_sample, &chosen) {
                    Ok(result) => {
                        info!(
                            window = n,
                            oos_sharpe = result.stats.sharpe,
                            oos_return_pct = result.stats.total_return_pct,
                            "out-of-sample complete"
                        );
                        WindowOutcome::Validated {
                            chosen,
                            out_of_sample: result.stats,
                        }
                    }
                    Err(reason) => {
                        warn!(window = n, %reason, "out-of-sample evaluation failed");
                        WindowOutcome::ValidationFailed { chosen, reason }
                    }
                }
            }
        };

        windows.push(WindowReport {
            split,
            evaluated: grid_outcome.evaluated(),
            zero_trade: grid_outcome.zero_trade,
            shortlist: grid_outcome
                .ranked
                .into_iter()
                .take(options.shortlist)
                .collect(),
            failures: grid_outcome.failures,
            outcome,
        });
    }

    Ok(WfoReport {
        schema_version: SCHEMA_VERSION,
        run_id: run_id(&dataset_hash, grid, options),
        dataset_hash,
        bar_count: series.len(),
        windows,
    })
}
