//! Daily time series: the shared substrate for the analytic kernel and the
//! price-history adapter.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Kaspa mainnet genesis day.
pub fn kaspa_genesis() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 11, 7).unwrap_or(NaiveDate::MIN)
}

/// Which source a series was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Price,
    Hashrate,
    Volume,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 3] = [SeriesKind::Price, SeriesKind::Hashrate, SeriesKind::Volume];

    pub fn unit(&self) -> &'static str {
        match self {
            SeriesKind::Price => "USD",
            SeriesKind::Hashrate => "H/s",
            SeriesKind::Volume => "USD",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::Price => "price",
            SeriesKind::Hashrate => "hashrate",
            SeriesKind::Volume => "volume",
        }
    }
}

impl std::fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SeriesKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price" => Ok(SeriesKind::Price),
            "hashrate" => Ok(SeriesKind::Hashrate),
            "volume" => Ok(SeriesKind::Volume),
            other => Err(format!("unknown series: {}", other)),
        }
    }
}

/// Days since genesis, offset by one so the genesis day maps to x = 1.
pub fn days_from_genesis(date: NaiveDate, genesis: NaiveDate) -> i64 {
    (date - genesis).num_days() + 1
}

/// One daily observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub date: NaiveDate,
    pub days_from_genesis: i64,
    pub value: f64,
}

/// Date-ordered series with unique dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub kind: SeriesKind,
    pub genesis: NaiveDate,
    points: Vec<TimePoint>,
}

impl Series {
    /// Build a series from raw `(date, value)` rows in any order.
    ///
    /// Rows dated before genesis are dropped (x must stay positive), as are
    /// negative or non-finite values. Duplicate dates keep the last occurrence.
    pub fn from_observations(
        kind: SeriesKind,
        genesis: NaiveDate,
        rows: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        let mut points: Vec<TimePoint> = rows
            .into_iter()
            .filter(|(_, value)| value.is_finite() && *value >= 0.0)
            .map(|(date, value)| TimePoint {
                date,
                days_from_genesis: days_from_genesis(date, genesis),
                value,
            })
            .filter(|p| p.days_from_genesis >= 1)
            .collect();

        // Stable sort keeps input order within a date, so the last one wins below.
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<TimePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Series {
            kind,
            genesis,
            points: deduped,
        }
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&TimePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TimePoint> {
        self.points.last()
    }

    /// Point exactly on `date`.
    pub fn get(&self, date: NaiveDate) -> Option<&TimePoint> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| &self.points[idx])
    }

    /// Points with `date <= cutoff`.
    pub fn up_to(&self, cutoff: NaiveDate) -> Series {
        self.filtered(|p| p.date <= cutoff)
    }

    /// Points with `from <= date <= to`.
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> Series {
        self.filtered(|p| p.date >= from && p.date <= to)
    }

    /// The trailing `days` calendar days ending at the last observation.
    pub fn trailing_days(&self, days: i64) -> Series {
        match self.last() {
            Some(last) => {
                let from = last.date - Duration::days(days.max(1) - 1);
                self.between(from, last.date)
            }
            None => self.clone(),
        }
    }

    fn filtered(&self, keep: impl Fn(&TimePoint) -> bool) -> Series {
        Series {
            kind: self.kind,
            genesis: self.genesis,
            points: self.points.iter().copied().filter(|p| keep(p)).collect(),
        }
    }
}

/// Observation pair on a common date, used for cross-series fits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedPoint {
    pub date: NaiveDate,
    pub x: f64,
    pub y: f64,
}

/// Join two series on date, dropping dates missing from either side.
pub fn pair_by_date(x_series: &Series, y_series: &Series) -> Vec<PairedPoint> {
    x_series
        .points()
        .iter()
        .filter_map(|xp| {
            y_series.get(xp.date).map(|yp| PairedPoint {
                date: xp.date,
                x: xp.value,
                y: yp.value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_from_genesis_offset() {
        let genesis = kaspa_genesis();
        assert_eq!(days_from_genesis(genesis, genesis), 1);
        assert_eq!(days_from_genesis(day(2021, 11, 17), genesis), 11);
        assert_eq!(days_from_genesis(day(2021, 11, 6), genesis), 0);
    }

    #[test]
    fn test_series_sorted_and_deduped_keep_last() {
        let genesis = day(2022, 1, 1);
        let series = Series::from_observations(
            SeriesKind::Price,
            genesis,
            vec![
                (day(2022, 1, 3), 3.0),
                (day(2022, 1, 1), 1.0),
                (day(2022, 1, 3), 30.0),
                (day(2022, 1, 2), 2.0),
            ],
        );

        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(2022, 1, 1), day(2022, 1, 2), day(2022, 1, 3)]);
        assert_eq!(series.last().unwrap().value, 30.0);
        assert_eq!(series.last().unwrap().days_from_genesis, 3);
    }

    #[test]
    fn test_series_drops_pre_genesis_and_invalid_values() {
        let genesis = day(2022, 1, 2);
        let series = Series::from_observations(
            SeriesKind::Volume,
            genesis,
            vec![
                (day(2022, 1, 1), 5.0),
                (day(2022, 1, 2), f64::NAN),
                (day(2022, 1, 3), -1.0),
                (day(2022, 1, 4), 4.0),
            ],
        );
        assert_eq!(series.len(), 1);
        assert_eq!(series.first().unwrap().days_from_genesis, 3);
    }

    #[test]
    fn test_prefix_and_trailing_filters() {
        let genesis = day(2022, 1, 1);
        let rows = (0..10).map(|i| (genesis + Duration::days(i), (i + 1) as f64));
        let series = Series::from_observations(SeriesKind::Price, genesis, rows);

        assert_eq!(series.up_to(day(2022, 1, 5)).len(), 5);
        let tail = series.trailing_days(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail.first().unwrap().date, day(2022, 1, 8));
    }

    #[test]
    fn test_pair_by_date_drops_missing() {
        let genesis = day(2022, 1, 1);
        let a = Series::from_observations(
            SeriesKind::Hashrate,
            genesis,
            vec![(day(2022, 1, 1), 10.0), (day(2022, 1, 2), 20.0), (day(2022, 1, 4), 40.0)],
        );
        let b = Series::from_observations(
            SeriesKind::Price,
            genesis,
            vec![(day(2022, 1, 2), 0.2), (day(2022, 1, 3), 0.3), (day(2022, 1, 4), 0.4)],
        );
        let pairs = pair_by_date(&a, &b);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], PairedPoint { date: day(2022, 1, 2), x: 20.0, y: 0.2 });
    }

    #[test]
    fn test_series_kind_parse() {
        assert_eq!("Hashrate".parse::<SeriesKind>(), Ok(SeriesKind::Hashrate));
        assert!("tvl".parse::<SeriesKind>().is_err());
    }
}
