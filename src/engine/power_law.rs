//! Power-law fitting `y = a * x^b` by ordinary least squares in ln–ln space.
//!
//! Natural logarithms are used throughout, including for r².

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("insufficient data: {points} positive point(s), need at least 2")]
    InsufficientData { points: usize },
    #[error("degenerate fit: all x values are equal")]
    DegenerateFit,
}

/// Fitted power law and its goodness of fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerLawFit {
    pub a: f64,
    pub b: f64,
    pub r_squared: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub points_used: usize,
}

impl PowerLawFit {
    /// Model value `a * x^b`; `None` where `x <= 0`.
    pub fn predict(&self, x: f64) -> Option<f64> {
        (x > 0.0).then(|| self.a * x.powf(self.b))
    }
}

/// Fit a power law over any record type through accessor closures.
///
/// Points where either selected value is not strictly positive are left out.
pub fn fit_power_law<T>(
    points: &[T],
    x_of: impl Fn(&T) -> f64,
    y_of: impl Fn(&T) -> f64,
) -> Result<PowerLawFit, FitError> {
    let pairs: Vec<(f64, f64)> = points.iter().map(|p| (x_of(p), y_of(p))).collect();
    fit_pairs(&pairs)
}

/// Fit a power law to raw `(x, y)` pairs.
pub fn fit_pairs(pairs: &[(f64, f64)]) -> Result<PowerLawFit, FitError> {
    let valid: Vec<(f64, f64)> = pairs
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite() && *x > 0.0 && *y > 0.0)
        .collect();
    let logs: Vec<(f64, f64)> = valid.iter().map(|(x, y)| (x.ln(), y.ln())).collect();

    let n = logs.len();
    if n < 2 {
        return Err(FitError::InsufficientData { points: n });
    }

    let nf = n as f64;
    let mean_lx = logs.iter().map(|(lx, _)| lx).sum::<f64>() / nf;
    let mean_ly = logs.iter().map(|(_, ly)| ly).sum::<f64>() / nf;

    let (sxx, sxy) = logs.iter().fold((0.0, 0.0), |(sxx, sxy), (lx, ly)| {
        let dx = lx - mean_lx;
        (sxx + dx * dx, sxy + dx * (ly - mean_ly))
    });
    if sxx <= f64::EPSILON * nf {
        return Err(FitError::DegenerateFit);
    }

    let b = sxy / sxx;
    let ln_a = mean_ly - b * mean_lx;

    let (ss_res, ss_tot) = logs.iter().fold((0.0, 0.0), |(res, tot), (lx, ly)| {
        let fitted = ln_a + b * lx;
        (res + (ly - fitted).powi(2), tot + (ly - mean_ly).powi(2))
    });
    // Constant y is fitted exactly by b = 0.
    let r_squared = if ss_tot > f64::EPSILON * nf {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let (x_min, x_max) = valid
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (x, _)| {
            (lo.min(*x), hi.max(*x))
        });

    Ok(PowerLawFit {
        a: ln_a.exp(),
        b,
        r_squared,
        x_min,
        x_max,
        points_used: n,
    })
}

/// `a * x^b` for every x; `None` where x is not positive.
pub fn expected_series(fit: &PowerLawFit, xs: &[f64]) -> Vec<Option<f64>> {
    xs.iter().map(|x| fit.predict(*x)).collect()
}

/// Percentage change of the exponent between a prefix fit and the full fit.
///
/// `None` when the prefix exponent is zero.
pub fn slope_delta_pct(full: &PowerLawFit, prefix: &PowerLawFit) -> Option<f64> {
    (prefix.b != 0.0).then(|| 100.0 * (full.b - prefix.b) / prefix.b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual} (tol {tol})"
        );
    }

    #[test]
    fn test_exact_quadratic() {
        let pairs: Vec<(f64, f64)> = (1..=5).map(|x| (x as f64, 2.0 * (x as f64).powi(2))).collect();
        let fit = fit_pairs(&pairs).unwrap();
        assert_close(fit.a, 2.0, 1e-9);
        assert_close(fit.b, 2.0, 1e-9);
        assert_close(fit.r_squared, 1.0, 1e-12);
        assert_eq!(fit.x_min, 1.0);
        assert_eq!(fit.x_max, 5.0);
    }

    #[test]
    fn test_synthetic_three_x_to_one_point_five() {
        let pairs: Vec<(f64, f64)> = (1..=1000)
            .map(|x| (x as f64, 3.0 * (x as f64).powf(1.5)))
            .collect();
        let fit = fit_pairs(&pairs).unwrap();
        assert_close(fit.a.ln(), 3.0f64.ln(), 1e-6);
        assert_close(fit.b, 1.5, 1e-6);
        assert_close(fit.r_squared, 1.0, 1e-6);
        assert_eq!(fit.points_used, 1000);
    }

    #[test]
    fn test_refit_of_expected_series_is_idempotent() {
        let pairs: Vec<(f64, f64)> = (1..=200)
            .map(|x| {
                let xf = x as f64;
                let noise = if x % 2 == 0 { 1.1 } else { 0.9 };
                (xf, 0.5 * xf.powf(0.8) * noise)
            })
            .collect();
        let fit = fit_pairs(&pairs).unwrap();
        let xs: Vec<f64> = pairs.iter().map(|(x, _)| *x).collect();
        let refit_pairs: Vec<(f64, f64)> = xs
            .iter()
            .zip(expected_series(&fit, &xs))
            .filter_map(|(x, y)| y.map(|y| (*x, y)))
            .collect();
        let refit = fit_pairs(&refit_pairs).unwrap();
        assert_close(refit.b, fit.b, 1e-9);
        assert_close(refit.r_squared, 1.0, 1e-9);
    }

    #[test]
    fn test_expected_series_monotonic_for_positive_b() {
        let fit = PowerLawFit {
            a: 1e-3,
            b: 2.5,
            r_squared: 1.0,
            x_min: 1.0,
            x_max: 100.0,
            points_used: 2,
        };
        let xs: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let ys: Vec<f64> = expected_series(&fit, &xs).into_iter().map(Option::unwrap).collect();
        assert!(ys.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_expected_undefined_for_non_positive_x() {
        let fit = fit_pairs(&[(1.0, 1.0), (2.0, 4.0)]).unwrap();
        assert_eq!(expected_series(&fit, &[0.0, -1.0]), vec![None, None]);
    }

    #[test]
    fn test_insufficient_data() {
        assert_eq!(fit_pairs(&[]), Err(FitError::InsufficientData { points: 0 }));
        assert_eq!(
            fit_pairs(&[(1.0, 2.0), (2.0, 0.0), (-3.0, 1.0)]),
            Err(FitError::InsufficientData { points: 1 })
        );
    }

    #[test]
    fn test_degenerate_fit() {
        assert_eq!(
            fit_pairs(&[(3.0, 1.0), (3.0, 2.0), (3.0, 5.0)]),
            Err(FitError::DegenerateFit)
        );
    }

    #[test]
    fn test_constant_y_has_zero_slope() {
        let fit = fit_pairs(&[(1.0, 7.0), (2.0, 7.0), (4.0, 7.0)]).unwrap();
        assert_close(fit.b, 0.0, 1e-12);
        assert_close(fit.a, 7.0, 1e-9);
        assert_eq!(fit.r_squared, 1.0);
    }

    #[test]
    fn test_fit_through_accessors() {
        struct Row {
            day: i64,
            close: f64,
        }
        let rows: Vec<Row> = (1..=10)
            .map(|d| Row {
                day: d,
                close: 4.0 * (d as f64).powf(0.5),
            })
            .collect();
        let fit = fit_power_law(&rows, |r| r.day as f64, |r| r.close).unwrap();
        assert_close(fit.a, 4.0, 1e-9);
        assert_close(fit.b, 0.5, 1e-9);
    }

    #[test]
    fn test_slope_delta() {
        let mk = |b| PowerLawFit {
            a: 1.0,
            b,
            r_squared: 1.0,
            x_min: 1.0,
            x_max: 2.0,
            points_used: 2,
        };
        assert_close(slope_delta_pct(&mk(4.4), &mk(4.0)).unwrap(), 10.0, 1e-9);
        assert_eq!(slope_delta_pct(&mk(1.0), &mk(0.0)), None);
    }
}
