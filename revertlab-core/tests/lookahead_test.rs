//! Look-ahead contamination tests.
//!
//! No value at bar t may depend on price data from bar t+1 or later.
//!
//! Method: compute on a truncated series (bars 0..100) and the full series
//! (bars 0..200); bars 0..100 must be identical. ATR's seed region
//! (bars 1..=period) lies inside both runs, so it compares equal too.

use chrono::{Duration, NaiveDate};
use revertlab_core::components::{build_composition, FilterKind, Indicator, StopKind, StrategyParams};
use revertlab_core::domain::{Bar, PriceSeries};
use revertlab_core::engine::run_strategy;
use revertlab_core::indicators::*;

/// Deterministic pseudo-random walk with wide candles.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut price = 100.0;
    let mut bars = Vec::with_capacity(n);
    for i in 0..n {
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let change = ((seed >> 33) % 200) as f64 * 0.02 - 2.0;
        let open = price;
        price = (price + change).max(10.0);
        let wick = ((seed >> 17) % 100) as f64 * 0.02;
        bars.push(Bar::new(
            start + Duration::minutes(30 * i as i64),
            open,
            open.max(price) + wick,
            open.min(price) - wick,
            price,
        ));
    }
    bars
}

fn same(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

fn assert_no_lookahead(indicator: &dyn Indicator, full: &[Bar], truncated_len: usize) {
    let full_out = indicator.compute(full);
    let trunc_out = indicator.compute(&full[..truncated_len]);
    for i in 0..truncated_len {
        assert!(
            same(full_out[i], trunc_out[i]),
            "{} differs at bar {i}: full={} truncated={}",
            indicator.name(),
            full_out[i],
            trunc_out[i]
        );
    }
}

#[test]
fn indicators_have_no_lookahead() {
    let bars = make_test_bars(200);
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(LogReturn),
        Box::new(PeriodReturn::new(20)),
        Box::new(CandleSizePct),
        Box::new(AvgCandleSize::new(20)),
        Box::new(Atr::new(14)),
        Box::new(Ema::new(10)),
        Box::new(Envelope::new(10, 0.01, EnvelopeBand::Upper)),
        Box::new(Envelope::new(10, 0.01, EnvelopeBand::Lower)),
    ];
    for ind in &indicators {
        assert_no_lookahead(ind.as_ref(), &bars, 100);
    }
}

#[test]
fn timeline_prefix_is_stable_under_extension() {
    let bars = make_test_bars(200);
    let full = PriceSeries::new(bars.clone()).unwrap();
    let truncated = PriceSeries::new(bars[..100].to_vec()).unwrap();

    for (filter, stop) in [
        (FilterKind::Momentum, StopKind::AtrTrailing),
        (FilterKind::Momentum, StopKind::Fixed),
        (FilterKind::Envelope, StopKind::AtrTrailing),
    ] {
        let params = StrategyParams {
            window: 10,
            desired_return: 0.005,
            atr_multiplier: 2.0,
            ewm_period: 10,
            ..Default::default()
        };
        let comp = build_composition(filter, stop, &params).unwrap();
        let a = run_strategy(&full, &comp).unwrap();
        let b = run_strategy(&truncated, &comp).unwrap();
        assert_eq!(
            &a.timeline.states()[..100],
            b.timeline.states(),
            "{filter:?}/{stop:?} timeline leaks future bars"
        );
        assert_eq!(&a.signals[..100], &b.signals[..]);
    }
}
