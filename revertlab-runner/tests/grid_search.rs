//! Grid search ranking and failure isolation with scripted evaluators.

use std::collections::BTreeMap;

use revertlab_core::domain::PriceSeries;
use revertlab_runner::{
    generate_synthetic, AutoSelector, BacktestResult, BarFrequency, Evaluate, GridSearchOptimizer,
    ParamAxis, ParamGrid, ParameterSet, PortfolioStats, RunError, Selector,
};

/// Returns canned statistics keyed by the `id` parameter.
struct Scripted;

fn stats(series: &PriceSeries, sharpe: f64, trades: usize) -> PortfolioStats {
    PortfolioStats {
        start: series.first_timestamp(),
        end: series.last_timestamp(),
        total_return_pct: sharpe,
        benchmark_return_pct: 0.0,
        max_drawdown_pct: 1.0,
        win_rate_pct: (trades > 0).then_some(50.0),
        sharpe,
        sortino: 0.0,
        calmar: 0.0,
        total_trades: trades,
        closed_trades: trades,
    }
}

impl Evaluate for Scripted {
    fn evaluate(&self, series: &PriceSeries, params: &ParameterSet) -> Result<BacktestResult, RunError> {
        let id = params.get("id").unwrap_or(0.0) as u32;
        let stats = match id {
            1 => stats(series, 1.2, 0),
            2 => stats(series, 0.8, 3),
            3 => panic!("evaluation blew up"),
            4 => {
                return Err(RunError::Series(
                    revertlab_core::domain::SeriesError::Empty,
                ))
            }
            _ => stats(series, 0.1, 1),
        };
        Ok(BacktestResult {
            params: params.clone(),
            stats,
        })
    }
}

fn grid(ids: &[f64]) -> ParamGrid {
    let mut axes = BTreeMap::new();
    axes.insert("id".to_string(), ParamAxis::Values(ids.to_vec()));
    ParamGrid::from_axes(&axes).unwrap()
}

fn series() -> PriceSeries {
    generate_synthetic(50, 3, BarFrequency::default()).unwrap()
}

#[test]
fn zero_trade_leader_is_excluded_and_lower_sharpe_selected() {
    let g = grid(&[1.0, 2.0]);
    let optimizer = GridSearchOptimizer::new(Some(2)).unwrap();
    let outcome = optimizer.search(&Scripted, &series(), &g.combinations());

    assert_eq!(outcome.zero_trade, 1);
    assert_eq!(outcome.ranked.len(), 1);
    assert_eq!(outcome.ranked[0].params.get("id"), Some(2.0));

    let chosen = AutoSelector.select(0, &outcome.ranked, &g).unwrap();
    assert_eq!(chosen.get("id"), Some(2.0));
    assert!((outcome.ranked[0].stats.sharpe - 0.8).abs() < 1e-12);
}

#[test]
fn panics_and_errors_become_tagged_failures() {
    let g = grid(&[2.0, 3.0, 4.0, 5.0]);
    let optimizer = GridSearchOptimizer::new(Some(2)).unwrap();
    let outcome = optimizer.search(&Scripted, &series(), &g.combinations());

    assert_eq!(outcome.evaluated(), 4);
    assert_eq!(outcome.ranked.len(), 2);
    assert_eq!(outcome.failures.len(), 2);

    let failed: Vec<f64> = outcome
        .failures
        .iter()
        .map(|f| f.params.get("id").unwrap())
        .collect();
    assert_eq!(failed, vec![3.0, 4.0]);
    assert!(outcome.failures[0].reason.contains("evaluation blew up"));
    assert!(outcome.failures[1].reason.contains("empty"));
}

#[test]
fn ranking_is_independent_of_worker_count() {
    let g = grid(&[5.0, 2.0, 6.0, 1.0, 7.0]);
    let s = series();
    let one = GridSearchOptimizer::new(Some(1))
        .unwrap()
        .search(&Scripted, &s, &g.combinations());
    let four = GridSearchOptimizer::new(Some(4))
        .unwrap()
        .search(&Scripted, &s, &g.combinations());
    assert_eq!(one, four);
}
