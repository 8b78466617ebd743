//! Deviation of observations from a fitted power law: percentage residuals,
//! rolling bands and the smoothed residual oscillator.

use super::power_law::PowerLawFit;
use serde::Serialize;

pub const DEFAULT_ROLLING_WINDOW: usize = 30;
pub const DEFAULT_OSCILLATOR_WINDOW: usize = 7;

/// Band layout around the fitted curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandConfig {
    /// Rolling window W for mean/std of the deviation; clamped to the series length.
    pub rolling_window: usize,
    /// Rolling bands sit at mean ± `band_sigmas` · std.
    pub band_sigmas: f64,
    /// Static lower band as a multiple of the fitted value.
    pub lower_multiplier: f64,
    /// Static upper band as a multiple of the fitted value.
    pub upper_multiplier: f64,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            rolling_window: DEFAULT_ROLLING_WINDOW,
            band_sigmas: 2.0,
            lower_multiplier: 0.4,
            upper_multiplier: 2.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviationPoint {
    pub x: f64,
    pub actual: f64,
    pub expected: Option<f64>,
    pub deviation_pct: Option<f64>,
    pub rolling_mean: Option<f64>,
    pub rolling_std: Option<f64>,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
    pub static_lower: Option<f64>,
    pub static_upper: Option<f64>,
}

/// `100 * (y - ŷ) / ŷ`, undefined when ŷ is not positive.
pub fn deviation_pct(actual: f64, expected: f64) -> Option<f64> {
    (expected > 0.0).then(|| 100.0 * (actual - expected) / expected)
}

/// Deviation rows aligned one-to-one with `points`.
pub fn deviation<T>(
    points: &[T],
    x_of: impl Fn(&T) -> f64,
    y_of: impl Fn(&T) -> f64,
    fit: &PowerLawFit,
    config: &BandConfig,
) -> Vec<DeviationPoint> {
    let base: Vec<(f64, f64, Option<f64>)> = points
        .iter()
        .map(|p| {
            let x = x_of(p);
            (x, y_of(p), fit.predict(x))
        })
        .collect();

    let pcts: Vec<Option<f64>> = base
        .iter()
        .map(|(_, y, expected)| expected.and_then(|e| deviation_pct(*y, e)))
        .collect();

    let window = config.rolling_window.max(1).min(pcts.len().max(1));
    let means = rolling_mean(&pcts, window);
    let stds = rolling_std(&pcts, window);

    base.iter()
        .enumerate()
        .map(|(i, (x, actual, expected))| {
            let bands = means[i].zip(stds[i]);
            DeviationPoint {
                x: *x,
                actual: *actual,
                expected: *expected,
                deviation_pct: pcts[i],
                rolling_mean: means[i],
                rolling_std: stds[i],
                upper_band: bands.map(|(m, s)| m + config.band_sigmas * s),
                lower_band: bands.map(|(m, s)| m - config.band_sigmas * s),
                static_lower: expected.map(|e| e * config.lower_multiplier),
                static_upper: expected.map(|e| e * config.upper_multiplier),
            }
        })
        .collect()
}

/// Rolling mean of the deviation percentages; the first `window - 1` values are `None`.
pub fn oscillator(deviation: &[DeviationPoint], smoothing_window: usize) -> Vec<Option<f64>> {
    let pcts: Vec<Option<f64>> = deviation.iter().map(|d| d.deviation_pct).collect();
    rolling_mean(&pcts, smoothing_window.max(1))
}

/// Trailing mean over `window` values. Undefined on warm-up or when any value
/// inside the window is undefined.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Trailing sample standard deviation (n - 1 denominator); needs `window >= 2`.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }
    rolling(values, window, |w| {
        let n = w.len() as f64;
        let mean = w.iter().sum::<f64>() / n;
        let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    })
}

fn rolling(
    values: &[Option<f64>],
    window: usize,
    stat: impl Fn(&[f64]) -> f64,
) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut buf: Vec<f64> = Vec::with_capacity(window);
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            buf.clear();
            for v in &values[i + 1 - window..=i] {
                buf.push((*v)?);
            }
            Some(stat(&buf))
        })
        .collect()
}
