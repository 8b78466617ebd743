pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{
    CsvSeriesSource, KaspaApi, KaspaApiError, KaspaRestClient, MemorySeriesSource, MockKaspaApi,
    SeriesSource,
};
pub use domain::{Address, Decimal, Direction, Series, SeriesKind, TimeMs};
pub use error::AppError;
pub use orchestration::{AnalysisService, SeriesCache, WalletEngine, WalletReport, WalletRequest};
