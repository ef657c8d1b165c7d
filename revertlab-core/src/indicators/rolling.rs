//! Trailing-window reductions shared by the return and candle indicators.
//!
//! Output at index `i` covers `values[i + 1 - window ..= i]`. Indices before
//! the window fills are NaN, and any NaN inside a window yields NaN.

/// Trailing sum over `window` values.
pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }
    for i in (window - 1)..n {
        result[i] = values[i + 1 - window..=i].iter().sum();
    }
    result
}

/// Trailing arithmetic mean over `window` values.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling_sum(values, window)
        .into_iter()
        .map(|s| s / window as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sum_fills_after_window() {
        let out = rolling_sum(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_approx(out[2], 6.0, DEFAULT_EPSILON);
        assert_approx(out[3], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_contaminates_only_covering_windows() {
        let out = rolling_sum(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(out[1].is_nan());
        assert!(out[2].is_nan());
        assert_approx(out[3], 7.0, DEFAULT_EPSILON);
        assert_approx(out[4], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn mean_divides_by_window() {
        let out = rolling_mean(&[2.0, 4.0, 6.0], 2);
        assert_approx(out[1], 3.0, DEFAULT_EPSILON);
        assert_approx(out[2], 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn short_input_is_all_nan() {
        assert!(rolling_mean(&[1.0, 2.0], 3).iter().all(|v| v.is_nan()));
        assert!(rolling_sum(&[1.0], 0).iter().all(|v| v.is_nan()));
    }
}
