//! Mock Kaspa API for testing without network calls.

use super::{KaspaApi, KaspaApiError, NetworkSummary, PageQuery, TransactionPage};
use crate::domain::{Address, Decimal, TransactionRecord};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock API that serves predefined transactions with real cursor semantics.
#[derive(Debug, Clone)]
pub struct MockKaspaApi {
    balance: Option<Decimal>,
    utxo_balance: Option<Decimal>,
    transactions: Vec<TransactionRecord>,
    inclusive_cursor: bool,
    fail_after_pages: Option<usize>,
    failure: KaspaApiError,
    malformed_per_page: usize,
    network: Option<NetworkSummary>,
    requests: Arc<AtomicUsize>,
    page_requests: Arc<AtomicUsize>,
}

impl MockKaspaApi {
    /// Create a mock with no balance and no transactions.
    pub fn new() -> Self {
        Self {
            balance: None,
            utxo_balance: None,
            transactions: Vec::new(),
            inclusive_cursor: false,
            fail_after_pages: None,
            failure: KaspaApiError::Timeout,
            malformed_per_page: 0,
            network: None,
            requests: Arc::new(AtomicUsize::new(0)),
            page_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the balance returned by fetch_balance.
    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = Some(balance);
        self
    }

    /// Set the UTXO sum; defaults to the balance.
    pub fn with_utxo_balance(mut self, balance: Decimal) -> Self {
        self.utxo_balance = Some(balance);
        self
    }

    pub fn with_transactions(mut self, txs: Vec<TransactionRecord>) -> Self {
        self.transactions.extend(txs);
        self
    }

    /// Treat `before` as inclusive so consecutive pages overlap on the boundary.
    pub fn with_inclusive_cursor(mut self) -> Self {
        self.inclusive_cursor = true;
        self
    }

    /// Serve `pages` pages successfully, then fail every page request with `error`.
    pub fn with_failure_after_pages(mut self, pages: usize, error: KaspaApiError) -> Self {
        self.fail_after_pages = Some(pages);
        self.failure = error;
        self
    }

    /// Report `count` unparseable records on every page.
    pub fn with_malformed_per_page(mut self, count: usize) -> Self {
        self.malformed_per_page = count;
        self
    }

    pub fn with_network_summary(mut self, summary: NetworkSummary) -> Self {
        self.network = Some(summary);
        self
    }

    /// Total requests served, across all endpoints and clones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Transaction page requests served, across clones.
    pub fn page_request_count(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    fn page(&self, query: &PageQuery) -> Vec<TransactionRecord> {
        let mut txs: Vec<&TransactionRecord> = self
            .transactions
            .iter()
            .filter(|tx| match query.before {
                Some(before) if self.inclusive_cursor => tx.block_time <= before,
                Some(before) => tx.block_time < before,
                None => true,
            })
            .collect();
        txs.sort_by(|a, b| b.block_time.cmp(&a.block_time));
        txs.into_iter().take(query.limit).cloned().collect()
    }
}

impl Default for MockKaspaApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KaspaApi for MockKaspaApi {
    async fn fetch_balance(&self, _address: &Address) -> Result<Decimal, KaspaApiError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.balance
            .ok_or_else(|| KaspaApiError::ParseError("Missing balance field".to_string()))
    }

    async fn fetch_transactions_page(
        &self,
        _address: &Address,
        query: &PageQuery,
    ) -> Result<TransactionPage, KaspaApiError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let served = self.page_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after_pages {
            if served >= limit {
                return Err(self.failure.clone());
            }
        }
        Ok(TransactionPage {
            transactions: self.page(query),
            malformed: self.malformed_per_page,
        })
    }

    async fn fetch_utxo_balance(&self, _address: &Address) -> Result<Decimal, KaspaApiError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.utxo_balance
            .or(self.balance)
            .ok_or_else(|| KaspaApiError::ParseError("Expected array response".to_string()))
    }

    async fn fetch_transaction_count(&self, _address: &Address) -> Result<u64, KaspaApiError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.transactions.len() as u64)
    }

    async fn fetch_network_summary(&self) -> Result<NetworkSummary, KaspaApiError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.network
            .clone()
            .ok_or_else(|| KaspaApiError::NetworkError("no network summary configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeMs;

    fn tx(id: &str, time: i64) -> TransactionRecord {
        TransactionRecord {
            transaction_id: id.to_string(),
            block_time: TimeMs::new(time),
            inputs: Vec::new(),
            outputs: Vec::new(),
            is_accepted: true,
        }
    }

    fn addr() -> Address {
        Address::parse("kaspa:qtest").unwrap()
    }

    fn ids(page: &TransactionPage) -> Vec<&str> {
        page.transactions
            .iter()
            .map(|t| t.transaction_id.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_pages_newest_first_with_exclusive_cursor() {
        let mock = MockKaspaApi::new().with_transactions(vec![tx("a", 1), tx("b", 2), tx("c", 3)]);
        let first = mock
            .fetch_transactions_page(&addr(), &PageQuery { limit: 2, before: None })
            .await
            .unwrap();
        assert_eq!(ids(&first), vec!["c", "b"]);

        let second = mock
            .fetch_transactions_page(
                &addr(),
                &PageQuery { limit: 2, before: Some(TimeMs::new(2)) },
            )
            .await
            .unwrap();
        assert_eq!(ids(&second), vec!["a"]);
        assert_eq!(mock.page_request_count(), 2);
    }

    #[tokio::test]
    async fn test_inclusive_cursor_overlaps() {
        let mock = MockKaspaApi::new()
            .with_transactions(vec![tx("a", 1), tx("b", 2), tx("c", 3)])
            .with_inclusive_cursor();
        let page = mock
            .fetch_transactions_page(
                &addr(),
                &PageQuery { limit: 5, before: Some(TimeMs::new(2)) },
            )
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_failure_after_pages() {
        let mock = MockKaspaApi::new()
            .with_transactions(vec![tx("a", 1)])
            .with_failure_after_pages(1, KaspaApiError::RateLimited);
        let query = PageQuery { limit: 5, before: None };
        assert!(mock.fetch_transactions_page(&addr(), &query).await.is_ok());
        let err = mock.fetch_transactions_page(&addr(), &query).await.unwrap_err();
        assert!(matches!(err, KaspaApiError::RateLimited));
    }

    #[tokio::test]
    async fn test_balance_and_request_counter() {
        let mock = MockKaspaApi::new();
        assert!(mock.fetch_balance(&addr()).await.is_err());
        let mock = mock.with_balance(Decimal::from_sompi(150_000_000));
        let shared = mock.clone();
        assert_eq!(
            shared.fetch_balance(&addr()).await.unwrap(),
            Decimal::from_str_canonical("1.5").unwrap()
        );
        assert_eq!(mock.request_count(), 2);
    }
}
