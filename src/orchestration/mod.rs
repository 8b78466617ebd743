//! Sessions and services that drive the engine against the data sources.

pub mod analysis;
pub mod cache;
pub mod fetch;
pub mod wallet;

pub use analysis::{
    build_cross_report, build_series_report, AnalysisConfig, AnalysisError, AnalysisService,
    CrossReport, LatestMetrics, ReportPoint, SeriesReport,
};
pub use cache::{PriceHistorySource, SeriesCache};
pub use fetch::{DateWindow, FetchInterruption, FetchOptions, FetchOutcome, FetchSession};
pub use wallet::{
    SessionStatus, WalletConfig, WalletEngine, WalletError, WalletReport, WalletRequest,
};
