//! Performance metrics — pure functions over an equity curve.
//!
//! Every metric is a pure function: equity curve (and bars-per-year where the
//! metric is annualised) in, scalar out. No dependency on the portfolio or
//! the engine.

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&last)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Compound annualised return, given `periods_per_year` bars per year.
///
/// Returns 0.0 for fewer than 2 points or non-positive equity.
pub fn annualized_return(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let n = equity_curve.len();
    if n < 2 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let initial = equity_curve[0];
    let last = equity_curve[n - 1];
    if initial <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    let years = (n - 1) as f64 / periods_per_year;
    (last / initial).powf(1.0 / years) - 1.0
}

/// Annualised Sharpe ratio of per-bar returns (risk-free rate zero).
///
/// Sharpe = mean(returns) / std(returns) * sqrt(periods_per_year).
/// Returns 0.0 if variance is zero or fewer than 2 returns.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * periods_per_year.sqrt()
}

/// Annualised Sortino ratio (downside deviation only).
///
/// Downside deviation is the root mean square of negative returns over all
/// returns. Returns 0.0 if there is no downside or fewer than 2 returns.
pub fn sortino_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r * r)
        .sum();
    if downside_sq == 0.0 {
        return 0.0;
    }
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / downside_std * periods_per_year.sqrt()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity never falls below a prior peak.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Calmar ratio: annualised return / |max drawdown|.
///
/// Returns 0.0 when there is no drawdown.
pub fn calmar_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 {
        return 0.0;
    }
    annualized_return(equity_curve, periods_per_year) / dd.abs()
}

/// Fraction of trade P&Ls that are strictly positive. `None` for no trades.
pub fn win_rate(trade_pnls: &[f64]) -> Option<f64> {
    if trade_pnls.is_empty() {
        return None;
    }
    Some(trade_pnls.iter().filter(|&&p| p > 0.0).count() as f64 / trade_pnls.len() as f64)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple per-bar returns from an equity curve.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn total_return_basic() {
        approx(total_return(&[100.0, 110.0, 121.0]), 0.21);
        approx(total_return(&[100.0]), 0.0);
    }

    #[test]
    fn max_drawdown_is_negative_fraction() {
        approx(max_drawdown(&[100.0, 120.0, 90.0, 130.0]), -0.25);
        approx(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
    }

    #[test]
    fn sharpe_zero_for_constant_equity() {
        assert_eq!(sharpe_ratio(&[100.0; 10], 365.0), 0.0);
    }

    #[test]
    fn sharpe_scales_with_sqrt_periods() {
        let eq = [100.0, 101.0, 100.5, 102.0, 101.0, 103.0];
        let daily = sharpe_ratio(&eq, 365.0);
        let hourly = sharpe_ratio(&eq, 365.0 * 24.0);
        approx(hourly / daily, 24.0_f64.sqrt());
    }

    #[test]
    fn sortino_zero_without_downside() {
        assert_eq!(sortino_ratio(&[100.0, 101.0, 102.0, 103.0], 365.0), 0.0);
        assert!(sortino_ratio(&[100.0, 99.0, 102.0, 103.0], 365.0) > 0.0);
    }

    #[test]
    fn annualized_return_one_year_of_daily_bars() {
        let mut eq = vec![100.0; 366];
        eq[365] = 110.0;
        approx(annualized_return(&eq, 365.0), 0.10);
    }

    #[test]
    fn calmar_uses_drawdown_magnitude() {
        let mut eq: Vec<f64> = vec![100.0; 366];
        eq[100] = 80.0;
        eq[365] = 110.0;
        approx(calmar_ratio(&eq, 365.0), 0.10 / 0.20);
        assert_eq!(calmar_ratio(&[100.0, 101.0], 365.0), 0.0);
    }

    #[test]
    fn win_rate_undefined_without_trades() {
        assert_eq!(win_rate(&[]), None);
        approx(win_rate(&[1.0, -1.0, 2.0, 0.0]).unwrap(), 0.5);
    }

    #[test]
    fn std_dev_uses_sample_variance() {
        approx(std_dev(&[1.0, 2.0, 3.0, 4.0]), (5.0_f64 / 3.0).sqrt());
    }
}
