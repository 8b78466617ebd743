//! Loading the daily price, hashrate and volume series.

use crate::domain::{Series, SeriesKind};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("csv parse error: {0}")]
    Csv(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("series not available: {0}")]
    Missing(SeriesKind),
}

/// Source of the daily series consumed by the analytic kernel and the
/// price-history adapter.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Genesis day used to compute `days_from_genesis`.
    fn genesis(&self) -> NaiveDate;

    async fn load_series(&self, kind: SeriesKind) -> Result<Series, SeriesError>;

    async fn load_price_series(&self) -> Result<Series, SeriesError> {
        self.load_series(SeriesKind::Price).await
    }

    async fn load_hashrate_series(&self) -> Result<(Series, NaiveDate), SeriesError> {
        let series = self.load_series(SeriesKind::Hashrate).await?;
        Ok((series, self.genesis()))
    }

    async fn load_volume_series(&self) -> Result<Series, SeriesError> {
        self.load_series(SeriesKind::Volume).await
    }
}

/// Reads `{dir}/price.csv`, `{dir}/hashrate.csv` and `{dir}/volume.csv`.
///
/// Each file needs a `date` column (`YYYY-MM-DD`, anything after the first ten
/// characters is ignored) and a value column named after the series, with or
/// without a unit suffix, or simply `value`. Other columns are ignored.
#[derive(Debug, Clone)]
pub struct CsvSeriesSource {
    dir: PathBuf,
    genesis: NaiveDate,
}

impl CsvSeriesSource {
    pub fn new(dir: impl Into<PathBuf>, genesis: NaiveDate) -> Self {
        Self {
            dir: dir.into(),
            genesis,
        }
    }

    pub fn path_for(&self, kind: SeriesKind) -> PathBuf {
        self.dir.join(format!("{}.csv", kind.as_str()))
    }

    pub fn parse_csv(
        kind: SeriesKind,
        genesis: NaiveDate,
        csv_bytes: &[u8],
    ) -> Result<Series, SeriesError> {
        #[derive(Debug, serde::Deserialize)]
        struct Row {
            date: String,
            #[serde(
                alias = "price",
                alias = "price_usd",
                alias = "hashrate",
                alias = "hashrate_hs",
                alias = "volume",
                alias = "volume_usd"
            )]
            value: String,
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(csv_bytes);

        let mut rows = Vec::new();
        let mut blank = 0usize;
        for record in reader.deserialize::<Row>() {
            let row = record.map_err(|e| SeriesError::Csv(e.to_string()))?;
            let date = parse_day(&row.date)?;
            if row.value.is_empty() {
                blank += 1;
                continue;
            }
            let value: f64 = row
                .value
                .parse()
                .map_err(|_| SeriesError::Csv(format!("invalid {} value: {}", kind, row.value)))?;
            rows.push((date, value));
        }
        if blank > 0 {
            debug!("Skipped {} blank {} rows", blank, kind);
        }

        Ok(Series::from_observations(kind, genesis, rows))
    }

    async fn read_file(path: &Path) -> Result<Vec<u8>, SeriesError> {
        tokio::fs::read(path).await.map_err(|e| SeriesError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

fn parse_day(raw: &str) -> Result<NaiveDate, SeriesError> {
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|_| SeriesError::InvalidDate(raw.to_string()))
}

#[async_trait]
impl SeriesSource for CsvSeriesSource {
    fn genesis(&self) -> NaiveDate {
        self.genesis
    }

    async fn load_series(&self, kind: SeriesKind) -> Result<Series, SeriesError> {
        let path = self.path_for(kind);
        let bytes = Self::read_file(&path).await?;
        let series = Self::parse_csv(kind, self.genesis, &bytes)?;
        if series.is_empty() {
            warn!("Series {} loaded from {} is empty", kind, path.display());
        } else {
            debug!("Loaded {} {} points from {}", series.len(), kind, path.display());
        }
        Ok(series)
    }
}

/// In-memory series source, mainly for tests and demos.
#[derive(Debug, Clone)]
pub struct MemorySeriesSource {
    genesis: NaiveDate,
    rows: HashMap<SeriesKind, Vec<(NaiveDate, f64)>>,
}

impl MemorySeriesSource {
    pub fn new(genesis: NaiveDate) -> Self {
        Self {
            genesis,
            rows: HashMap::new(),
        }
    }

    pub fn with_series(mut self, kind: SeriesKind, rows: Vec<(NaiveDate, f64)>) -> Self {
        self.rows.insert(kind, rows);
        self
    }
}

#[async_trait]
impl SeriesSource for MemorySeriesSource {
    fn genesis(&self) -> NaiveDate {
        self.genesis
    }

    async fn load_series(&self, kind: SeriesKind) -> Result<Series, SeriesError> {
        let rows = self.rows.get(&kind).ok_or(SeriesError::Missing(kind))?;
        Ok(Series::from_observations(kind, self.genesis, rows.iter().copied()))
    }
}
