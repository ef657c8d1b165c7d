//! Criterion benchmarks for RevertLab hot paths.
//!
//! Benchmarks:
//! 1. Indicator precompute for a momentum + ATR composition
//! 2. Lifecycle state machine over precomputed signals
//! 3. Full strategy run (indicators, patterns, filter, lifecycle)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use revertlab_core::components::filter::Signal;
use revertlab_core::components::{
    build_composition, precompute_indicators, FilterKind, StopKind, StrategyParams,
};
use revertlab_core::domain::{Bar, PriceSeries};
use revertlab_core::engine::{run_lifecycle, run_strategy};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let start = chrono::NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0 + (i as f64 * 0.037).cos() * 4.0;
            let open = close - 0.3 * (i as f64 * 0.7).sin();
            Bar::new(
                start + chrono::Duration::minutes(30 * i as i64),
                open,
                open.max(close) + 1.2,
                open.min(close) - 1.2,
                close,
            )
        })
        .collect()
}

fn params() -> StrategyParams {
    StrategyParams {
        window: 20,
        desired_return: 0.005,
        atr_multiplier: 3.0,
        ..Default::default()
    }
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_precompute(c: &mut Criterion) {
    let comp = build_composition(FilterKind::Momentum, StopKind::AtrTrailing, &params()).unwrap();
    let mut group = c.benchmark_group("precompute");
    for n in [1_000, 10_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| precompute_indicators(black_box(&comp.indicators), black_box(bars)))
        });
    }
    group.finish();
}

fn bench_lifecycle(c: &mut Criterion) {
    let comp = build_composition(FilterKind::Momentum, StopKind::AtrTrailing, &params()).unwrap();
    let mut group = c.benchmark_group("lifecycle");
    for n in [1_000, 10_000] {
        let bars = make_bars(n);
        let iv = precompute_indicators(&comp.indicators, &bars);
        let signals: Vec<Signal> = (0..n)
            .map(|i| Signal {
                bullish: i % 37 == 0,
                bearish: i % 53 == 0,
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| run_lifecycle(black_box(bars), &signals, comp.stop.as_ref(), &iv).unwrap())
        });
    }
    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let series = PriceSeries::new(make_bars(10_000)).unwrap();
    let comp = build_composition(FilterKind::Momentum, StopKind::AtrTrailing, &params()).unwrap();
    c.bench_function("run_strategy_10k", |b| {
        b.iter(|| run_strategy(black_box(&series), &comp).unwrap())
    });
}

criterion_group!(benches, bench_precompute, bench_lifecycle, bench_full_run);
criterion_main!(benches);
