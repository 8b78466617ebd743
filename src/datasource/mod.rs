//! Data source abstraction for the Kaspa REST API and the series substrate.

use crate::domain::{Address, Decimal, TimeMs, TransactionRecord};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

pub mod kaspa;
pub mod mock;
pub mod series_csv;

pub use kaspa::{KaspaRestClient, RetryPolicy};
pub use mock::MockKaspaApi;
pub use series_csv::{CsvSeriesSource, MemorySeriesSource, SeriesError, SeriesSource};

/// Largest page the full-transactions endpoint serves.
pub const MAX_PAGE_SIZE: usize = 500;

/// Cursor and size of one full-transactions page request.
///
/// Pages walk backward only: `before` is an exclusive millisecond bound on
/// `block_time`, and any lower date bound is applied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: usize,
    pub before: Option<TimeMs>,
}

/// One page of accepted transactions plus the count of records that failed to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPage {
    pub transactions: Vec<TransactionRecord>,
    pub malformed: usize,
}

/// Best-effort network overview from the `/info/*` endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub network_name: Option<String>,
    pub block_count: Option<u64>,
    pub difficulty: Option<f64>,
    pub virtual_daa_score: Option<u64>,
    pub circulating_supply_kas: Option<Decimal>,
    pub max_supply_kas: Option<Decimal>,
    pub hashrate_ths: Option<f64>,
    pub block_reward_kas: Option<f64>,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
}

/// Read-only access to the Kaspa blockchain REST API.
///
/// Implementations own retry/backoff; callers see only the final outcome.
#[async_trait]
pub trait KaspaApi: Send + Sync + fmt::Debug {
    /// Current confirmed balance in KAS.
    async fn fetch_balance(&self, address: &Address) -> Result<Decimal, KaspaApiError>;

    /// One page of accepted transactions, newest first.
    async fn fetch_transactions_page(
        &self,
        address: &Address,
        query: &PageQuery,
    ) -> Result<TransactionPage, KaspaApiError>;

    /// Balance as the sum of unspent outputs, in KAS.
    async fn fetch_utxo_balance(&self, address: &Address) -> Result<Decimal, KaspaApiError>;

    /// Total number of transactions the indexer knows for the address.
    async fn fetch_transaction_count(&self, address: &Address) -> Result<u64, KaspaApiError>;

    async fn fetch_network_summary(&self) -> Result<NetworkSummary, KaspaApiError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum KaspaApiError {
    /// Connection failure, DNS failure, reset
    NetworkError(String),
    /// Request exceeded the per-request timeout
    Timeout,
    /// Non-success HTTP status
    HttpError { status: u16, message: String },
    /// Invalid JSON or missing fields
    ParseError(String),
    /// 429 from the server
    RateLimited,
    /// Other error
    Other(String),
}

impl KaspaApiError {
    /// Whether another attempt may succeed: timeouts, connection errors, 5xx and 429.
    pub fn is_transient(&self) -> bool {
        match self {
            KaspaApiError::NetworkError(_) | KaspaApiError::Timeout | KaspaApiError::RateLimited => {
                true
            }
            KaspaApiError::HttpError { status, .. } => *status >= 500,
            KaspaApiError::ParseError(_) | KaspaApiError::Other(_) => false,
        }
    }
}

impl fmt::Display for KaspaApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KaspaApiError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            KaspaApiError::Timeout => write!(f, "Request timed out"),
            KaspaApiError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            KaspaApiError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            KaspaApiError::RateLimited => write!(f, "Rate limited"),
            KaspaApiError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for KaspaApiError {}
