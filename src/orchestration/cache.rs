//! Process-wide, lazily loaded, read-only series snapshots.

use crate::datasource::{SeriesError, SeriesSource};
use crate::domain::{PriceHistory, Series, SeriesKind};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Supplies the wallet engine with its immutable price snapshot.
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    async fn load_price_history(&self) -> Result<Arc<PriceHistory>, SeriesError>;
}

/// Loads each series on first use and hands out shared snapshots afterwards.
///
/// A failed load leaves the slot empty, so the next caller retries it.
pub struct SeriesCache {
    source: Arc<dyn SeriesSource>,
    price: OnceCell<Arc<Series>>,
    hashrate: OnceCell<Arc<Series>>,
    volume: OnceCell<Arc<Series>>,
    price_history: OnceCell<Arc<PriceHistory>>,
}

impl SeriesCache {
    pub fn new(source: Arc<dyn SeriesSource>) -> Self {
        Self {
            source,
            price: OnceCell::new(),
            hashrate: OnceCell::new(),
            volume: OnceCell::new(),
            price_history: OnceCell::new(),
        }
    }

    fn slot(&self, kind: SeriesKind) -> &OnceCell<Arc<Series>> {
        match kind {
            SeriesKind::Price => &self.price,
            SeriesKind::Hashrate => &self.hashrate,
            SeriesKind::Volume => &self.volume,
        }
    }

    pub async fn get(&self, kind: SeriesKind) -> Result<Arc<Series>, SeriesError> {
        self.slot(kind)
            .get_or_try_init(|| async {
                let series = match kind {
                    SeriesKind::Price => self.source.load_price_series().await?,
                    SeriesKind::Hashrate => self.source.load_hashrate_series().await?.0,
                    SeriesKind::Volume => self.source.load_volume_series().await?,
                };
                tracing::info!("Cached {} series ({} points)", kind, series.len());
                Ok::<_, SeriesError>(Arc::new(series))
            })
            .await
            .map(Arc::clone)
    }

    /// Whether `kind` has been loaded already.
    pub fn is_loaded(&self, kind: SeriesKind) -> bool {
        self.slot(kind).initialized()
    }
}

impl std::fmt::Debug for SeriesCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesCache")
            .field("price", &self.price.initialized())
            .field("hashrate", &self.hashrate.initialized())
            .field("volume", &self.volume.initialized())
            .finish()
    }
}

#[async_trait]
impl PriceHistorySource for SeriesCache {
    async fn load_price_history(&self) -> Result<Arc<PriceHistory>, SeriesError> {
        self.price_history
            .get_or_try_init(|| async {
                let series = self.get(SeriesKind::Price).await?;
                Ok::<_, SeriesError>(Arc::new(PriceHistory::from_series(&series)))
            })
            .await
            .map(Arc::clone)
    }
}

#[async_trait]
impl PriceHistorySource for PriceHistory {
    async fn load_price_history(&self) -> Result<Arc<PriceHistory>, SeriesError> {
        Ok(Arc::new(self.clone()))
    }
}
