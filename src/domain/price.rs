//! Price-history view handed to the wallet engine.

use crate::domain::series::Series;
use crate::domain::{day_start_ms, Decimal, TimeMs};
use chrono::NaiveDate;
use serde::Serialize;

/// Daily USD price keyed by UTC-midnight timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub timestamp_ms: TimeMs,
    pub date_iso: String,
    pub price_usd: Decimal,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price_usd: Decimal) -> Self {
        Self {
            timestamp_ms: TimeMs::new(day_start_ms(date)),
            date_iso: date.format("%Y-%m-%d").to_string(),
            price_usd,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp_ms.date()
    }
}

/// Immutable, chronologically sorted price snapshot without duplicate days.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceHistory {
    points: Vec<PricePoint>,
}

impl PriceHistory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sort by timestamp and keep the last point per day.
    pub fn from_points(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp_ms);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.timestamp_ms == point.timestamp_ms => *last = point,
                _ => deduped.push(point),
            }
        }
        Self { points: deduped }
    }

    /// Adapt a loaded price series. Values that do not fit a decimal are skipped.
    pub fn from_series(series: &Series) -> Self {
        let points = series
            .points()
            .iter()
            .filter_map(|p| Decimal::from_f64(p.value).map(|price| PricePoint::new(p.date, price)))
            .collect();
        Self::from_points(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Most recent price whose day is on or before `date`.
    pub fn on_or_before(&self, date: NaiveDate) -> Option<&PricePoint> {
        let cutoff = TimeMs::new(day_start_ms(date));
        let idx = self.points.partition_point(|p| p.timestamp_ms <= cutoff);
        idx.checked_sub(1).map(|i| &self.points[i])
    }

    /// Price for exactly `date`, if the source has that day.
    pub fn on(&self, date: NaiveDate) -> Option<&PricePoint> {
        let key = TimeMs::new(day_start_ms(date));
        self.points
            .binary_search_by_key(&key, |p| p.timestamp_ms)
            .ok()
            .map(|idx| &self.points[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::SeriesKind;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_from_points_sorts_and_dedups() {
        let history = PriceHistory::from_points(vec![
            PricePoint::new(day(2024, 1, 3), dec("0.3")),
            PricePoint::new(day(2024, 1, 1), dec("0.1")),
            PricePoint::new(day(2024, 1, 3), dec("0.33")),
        ]);
        assert_eq!(history.points().len(), 2);
        assert_eq!(history.last().unwrap().price_usd, dec("0.33"));
        assert_eq!(history.first().unwrap().date_iso, "2024-01-01");
    }

    #[test]
    fn test_on_or_before() {
        let history = PriceHistory::from_points(vec![
            PricePoint::new(day(2024, 1, 1), dec("0.1")),
            PricePoint::new(day(2024, 1, 5), dec("0.5")),
        ]);
        assert!(history.on_or_before(day(2023, 12, 31)).is_none());
        assert_eq!(history.on_or_before(day(2024, 1, 1)).unwrap().price_usd, dec("0.1"));
        assert_eq!(history.on_or_before(day(2024, 1, 4)).unwrap().price_usd, dec("0.1"));
        assert_eq!(history.on_or_before(day(2024, 2, 1)).unwrap().price_usd, dec("0.5"));
        assert!(history.on(day(2024, 1, 4)).is_none());
    }

    #[test]
    fn test_from_series() {
        let series = Series::from_observations(
            SeriesKind::Price,
            day(2024, 1, 1),
            vec![(day(2024, 1, 2), 0.25), (day(2024, 1, 1), 0.5)],
        );
        let history = PriceHistory::from_series(&series);
        assert_eq!(history.points().len(), 2);
        assert_eq!(history.first().unwrap().price_usd, dec("0.5"));
        assert!(history.points()[0].timestamp_ms < history.points()[1].timestamp_ms);
    }
}
