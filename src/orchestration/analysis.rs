//! Power-law reports for the price, hashrate and volume pages.

use super::cache::SeriesCache;
use crate::datasource::SeriesError;
use crate::domain::{pair_by_date, PairedPoint, Series, SeriesKind, TimePoint};
use crate::engine::{deviation, fit_power_law, oscillator, slope_delta_pct, BandConfig, FitError, PowerLawFit};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_SLOPE_DELTA_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Fit(#[from] FitError),
    #[error("invalid window: {0}")]
    InvalidWindow(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub bands: BandConfig,
    pub oscillator_window: usize,
    /// Age of the prefix fit the slope delta compares against.
    pub slope_delta_days: i64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bands: BandConfig::default(),
            oscillator_window: crate::engine::deviation::DEFAULT_OSCILLATOR_WINDOW,
            slope_delta_days: DEFAULT_SLOPE_DELTA_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPoint {
    pub date: NaiveDate,
    pub days_from_genesis: i64,
    pub value: f64,
    pub expected: Option<f64>,
    pub deviation_pct: Option<f64>,
    pub rolling_mean: Option<f64>,
    pub rolling_std: Option<f64>,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
    pub static_lower: Option<f64>,
    pub static_upper: Option<f64>,
    pub oscillator: Option<f64>,
}

/// Headline numbers for the most recent observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestMetrics {
    pub date: NaiveDate,
    pub days_from_genesis: i64,
    pub value: f64,
    pub expected: Option<f64>,
    pub deviation_pct: Option<f64>,
    /// Observed over fitted value.
    pub fair_value_multiple: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesReport {
    pub kind: SeriesKind,
    pub unit: &'static str,
    pub genesis: NaiveDate,
    pub window_days: Option<i64>,
    pub fit: PowerLawFit,
    pub prefix_fit: Option<PowerLawFit>,
    pub slope_delta_pct: Option<f64>,
    pub latest: Option<LatestMetrics>,
    pub points: Vec<ReportPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossPoint {
    pub date: NaiveDate,
    pub hashrate: f64,
    pub price: f64,
    pub expected_price: Option<f64>,
    pub deviation_pct: Option<f64>,
}

/// Price fitted as a power law of hashrate, paired by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossReport {
    pub fit: PowerLawFit,
    pub points: Vec<CrossPoint>,
}

/// Fit, deviation rows, oscillator and slope delta for one series.
pub fn build_series_report(
    series: &Series,
    window_days: Option<i64>,
    config: &AnalysisConfig,
) -> Result<SeriesReport, AnalysisError> {
    let windowed = match window_days {
        Some(days) if days < 2 => {
            return Err(AnalysisError::InvalidWindow(
                "windowDays must be at least 2".to_string(),
            ))
        }
        Some(days) => series.trailing_days(days),
        None => series.clone(),
    };

    let x_of = |p: &TimePoint| p.days_from_genesis as f64;
    let y_of = |p: &TimePoint| p.value;

    let fit = fit_power_law(windowed.points(), x_of, y_of)?;

    let prefix_fit = windowed.last().and_then(|last| {
        let cutoff = last.date - Duration::days(config.slope_delta_days);
        fit_power_law(windowed.up_to(cutoff).points(), x_of, y_of).ok()
    });
    let slope_delta = prefix_fit.as_ref().and_then(|prefix| slope_delta_pct(&fit, prefix));

    let rows = deviation(windowed.points(), x_of, y_of, &fit, &config.bands);
    let osc = oscillator(&rows, config.oscillator_window);

    let points: Vec<ReportPoint> = windowed
        .points()
        .iter()
        .zip(rows)
        .zip(osc)
        .map(|((p, d), oscillator)| ReportPoint {
            date: p.date,
            days_from_genesis: p.days_from_genesis,
            value: p.value,
            expected: d.expected,
            deviation_pct: d.deviation_pct,
            rolling_mean: d.rolling_mean,
            rolling_std: d.rolling_std,
            upper_band: d.upper_band,
            lower_band: d.lower_band,
            static_lower: d.static_lower,
            static_upper: d.static_upper,
            oscillator,
        })
        .collect();

    let latest = points.last().map(|p| LatestMetrics {
        date: p.date,
        days_from_genesis: p.days_from_genesis,
        value: p.value,
        expected: p.expected,
        deviation_pct: p.deviation_pct,
        fair_value_multiple: p.expected.filter(|e| *e > 0.0).map(|e| p.value / e),
    });

    Ok(SeriesReport {
        kind: series.kind,
        unit: series.kind.unit(),
        genesis: series.genesis,
        window_days,
        fit,
        prefix_fit,
        slope_delta_pct: slope_delta,
        latest,
        points,
    })
}

/// Fit `price = a * hashrate^b` over dates present in both series.
pub fn build_cross_report(
    hashrate: &Series,
    price: &Series,
    config: &AnalysisConfig,
) -> Result<CrossReport, AnalysisError> {
    let pairs = pair_by_date(hashrate, price);
    let x_of = |p: &PairedPoint| p.x;
    let y_of = |p: &PairedPoint| p.y;

    let fit = fit_power_law(&pairs, x_of, y_of)?;
    let rows = deviation(&pairs, x_of, y_of, &fit, &config.bands);

    let points = pairs
        .iter()
        .zip(rows)
        .map(|(p, d)| CrossPoint {
            date: p.date,
            hashrate: p.x,
            price: p.y,
            expected_price: d.expected,
            deviation_pct: d.deviation_pct,
        })
        .collect();

    Ok(CrossReport { fit, points })
}

/// Report assembly over the shared series cache.
#[derive(Debug, Clone)]
pub struct AnalysisService {
    cache: Arc<SeriesCache>,
    config: AnalysisConfig,
}

impl AnalysisService {
    pub fn new(cache: Arc<SeriesCache>, config: AnalysisConfig) -> Self {
        Self { cache, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    pub async fn report(
        &self,
        kind: SeriesKind,
        window_days: Option<i64>,
    ) -> Result<SeriesReport, AnalysisError> {
        let series = self.cache.get(kind).await?;
        build_series_report(&series, window_days, &self.config)
    }

    pub async fn price_vs_hashrate(&self) -> Result<CrossReport, AnalysisError> {
        let hashrate = self.cache.get(SeriesKind::Hashrate).await?;
        let price = self.cache.get(SeriesKind::Price).await?;
        build_cross_report(&hashrate, &price, &self.config)
    }
}
