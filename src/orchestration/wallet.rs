//! Wallet session: fetch, extract, reconstruct and price one address.

use super::cache::PriceHistorySource;
use super::fetch::{DateWindow, FetchInterruption, FetchOptions, FetchSession, DEFAULT_MAX_TRANSACTIONS};
use crate::datasource::{KaspaApi, KaspaApiError, MAX_PAGE_SIZE};
use crate::domain::{
    Address, AddressParseError, BalancePoint, BalanceRow, CostBasisEvent, Decimal, Direction,
    LedgerEntry, PriceHistory, TimeMs, WalletSummary,
};
use crate::engine::{cost_basis_history, daily_balances, extract_net_changes, reconstruct_balances};
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle of a wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Fetching,
    Extracting,
    Reconstructing,
    Pricing,
    Ready,
    Partial,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Ready | SessionStatus::Partial | SessionStatus::Failed
        )
    }
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressParseError),
    #[error("invalid window: {0}")]
    InvalidWindow(String),
    #[error("balance unavailable: {0}")]
    MissingBalance(String),
    #[error("kaspa api unavailable: {0}")]
    Network(KaspaApiError),
    #[error("session cancelled before any data was gathered")]
    Cancelled,
}

/// Per-session limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletConfig {
    pub page_size: usize,
    pub max_transactions: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            max_transactions: DEFAULT_MAX_TRANSACTIONS,
        }
    }
}

/// Caller input for one session. The address is validated by the engine.
#[derive(Debug, Clone, Default)]
pub struct WalletRequest {
    pub address: String,
    pub from: Option<TimeMs>,
    pub to: Option<TimeMs>,
    pub max_transactions: Option<usize>,
}

impl WalletRequest {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}

/// Everything a finished session produces.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletReport {
    pub session_id: Uuid,
    pub address: Address,
    pub status: SessionStatus,
    pub warnings: Vec<String>,
    pub ledger: Vec<LedgerEntry>,
    pub daily: Vec<BalanceRow>,
    pub cost_basis: Vec<CostBasisEvent>,
    pub summary: WalletSummary,
    /// Sum of unspent outputs, when the UTXO view answered.
    pub utxo_balance: Option<Decimal>,
    pub pages: usize,
    pub malformed: usize,
    pub duplicates: usize,
}

/// Tracks the session state and logs transitions.
#[derive(Debug)]
struct Session {
    id: Uuid,
    status: SessionStatus,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Idle,
        }
    }

    fn advance(&mut self, next: SessionStatus) {
        debug!("Session {}: {:?} -> {:?}", self.id, self.status, next);
        self.status = next;
    }

    fn fail(&mut self, error: WalletError) -> WalletError {
        self.advance(SessionStatus::Failed);
        warn!("Session {} failed: {}", self.id, error);
        error
    }
}

#[derive(Clone)]
pub struct WalletEngine {
    api: Arc<dyn KaspaApi>,
    prices: Arc<dyn PriceHistorySource>,
    config: WalletConfig,
}

impl WalletEngine {
    pub fn new(
        api: Arc<dyn KaspaApi>,
        prices: Arc<dyn PriceHistorySource>,
        config: WalletConfig,
    ) -> Self {
        Self {
            api,
            prices,
            config,
        }
    }

    pub async fn run(&self, request: &WalletRequest) -> Result<WalletReport, WalletError> {
        self.run_with_cancel(request, &AtomicBool::new(false)).await
    }

    /// Run a session that stops paging once `cancel` is set.
    ///
    /// Cancellation is handled like retry exhaustion: the session ends
    /// `partial` when some transactions were gathered, and fails otherwise.
    pub async fn run_with_cancel(
        &self,
        request: &WalletRequest,
        cancel: &AtomicBool,
    ) -> Result<WalletReport, WalletError> {
        let mut session = Session::new();

        let address = Address::parse(&request.address).map_err(|e| session.fail(e.into()))?;
        let window = DateWindow::new(request.from, request.to);
        if !window.is_valid() {
            return Err(session.fail(WalletError::InvalidWindow(
                "fromMs must not be after toMs".to_string(),
            )));
        }

        info!(
            "Wallet session {} start: address={} from={:?} to={:?}",
            session.id,
            address,
            window.from.map(|t| t.as_ms()),
            window.to.map(|t| t.as_ms())
        );
        session.advance(SessionStatus::Fetching);

        let current_balance = match self.api.fetch_balance(&address).await {
            Ok(balance) => balance,
            Err(KaspaApiError::ParseError(msg)) => {
                return Err(session.fail(WalletError::MissingBalance(msg)))
            }
            Err(e) => return Err(session.fail(WalletError::Network(e))),
        };

        match self.api.fetch_transaction_count(&address).await {
            Ok(total) => info!("Session {}: indexer reports {} transactions", session.id, total),
            Err(e) => debug!("Session {}: transaction count unavailable: {}", session.id, e),
        }

        let mut warnings = Vec::new();
        let utxo_balance = match self.api.fetch_utxo_balance(&address).await {
            Ok(utxo) => {
                if utxo != current_balance {
                    warn!(
                        "Session {}: UTXO sum {} differs from balance {}",
                        session.id, utxo, current_balance
                    );
                    warnings.push(format!(
                        "UTXO sum {} differs from reported balance {}",
                        utxo, current_balance
                    ));
                }
                Some(utxo)
            }
            Err(e) => {
                debug!("Session {}: UTXO view unavailable: {}", session.id, e);
                None
            }
        };
        let prices = match self.prices.load_price_history().await {
            Ok(history) => history,
            Err(e) => {
                warn!("Session {}: price history unavailable: {}", session.id, e);
                warnings.push(format!("price history unavailable: {}", e));
                Arc::new(PriceHistory::empty())
            }
        };

        let options = FetchOptions {
            page_size: self.config.page_size,
            max_transactions: request
                .max_transactions
                .unwrap_or(self.config.max_transactions)
                .max(1),
            window,
        };
        let outcome = FetchSession::new(options).run(self.api.as_ref(), &address, cancel).await;

        let mut partial = false;
        if let Some(interruption) = &outcome.interruption {
            if outcome.transactions.is_empty() {
                let error = match interruption {
                    FetchInterruption::Api(e) => WalletError::Network(e.clone()),
                    FetchInterruption::Cancelled => WalletError::Cancelled,
                };
                return Err(session.fail(error));
            }
            partial = true;
            warnings.push(format!(
                "history incomplete after {} pages: {}",
                outcome.pages, interruption
            ));
        }
        if outcome.capped {
            warnings.push(format!(
                "stopped at the {} transaction cap",
                options.max_transactions
            ));
        }
        if outcome.malformed > 0 {
            warnings.push(format!("{} malformed records skipped", outcome.malformed));
        }

        session.advance(SessionStatus::Extracting);
        let changes = extract_net_changes(&outcome.transactions, &address);

        session.advance(SessionStatus::Reconstructing);
        let points = reconstruct_balances(&changes, current_balance);

        session.advance(SessionStatus::Pricing);
        let cost_basis = cost_basis_history(&changes, &prices);
        let ledger = enrich_ledger(&points, &prices);
        let as_of = window.to.unwrap_or_else(TimeMs::now).date();
        let daily = daily_balances(&points, current_balance, &prices, &cost_basis, as_of);
        let summary = summarize(&points, current_balance, &prices, &cost_basis);

        session.advance(if partial {
            SessionStatus::Partial
        } else {
            SessionStatus::Ready
        });
        info!(
            "Wallet session {} end: status={:?} transactions={} pages={} malformed={}",
            session.id,
            session.status,
            ledger.len(),
            outcome.pages,
            outcome.malformed
        );

        Ok(WalletReport {
            session_id: session.id,
            address,
            status: session.status,
            warnings,
            ledger,
            daily,
            cost_basis,
            summary,
            utxo_balance,
            pages: outcome.pages,
            malformed: outcome.malformed,
            duplicates: outcome.duplicates,
        })
    }
}

impl std::fmt::Debug for WalletEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletEngine")
            .field("api", &self.api)
            .field("config", &self.config)
            .finish()
    }
}

/// Attach the day's price (latest on or before it) and the USD value of each change.
pub fn enrich_ledger(points: &[BalancePoint], prices: &PriceHistory) -> Vec<LedgerEntry> {
    points
        .iter()
        .map(|p| {
            let date = p.timestamp_ms.date();
            let price_usd = prices.on_or_before(date).map(|pp| pp.price_usd);
            LedgerEntry {
                transaction_id: p.transaction_id.clone(),
                timestamp_ms: p.timestamp_ms,
                date,
                net_change_kas: p.net_change_kas,
                direction: p.direction,
                balance_after: p.balance_after,
                price_usd,
                value_usd: price_usd.map(|price| price * p.net_change_kas),
            }
        })
        .collect()
}

pub fn summarize(
    points: &[BalancePoint],
    current_balance: Decimal,
    prices: &PriceHistory,
    cost_basis: &[CostBasisEvent],
) -> WalletSummary {
    let total_in: Decimal = points
        .iter()
        .filter(|p| p.direction == Direction::In)
        .map(|p| p.net_change_kas)
        .sum();
    let total_out: Decimal = points
        .iter()
        .filter(|p| p.direction == Direction::Out)
        .map(|p| p.net_change_kas.abs())
        .sum();
    let latest_price = prices.last().map(|p| p.price_usd);

    WalletSummary {
        current_balance,
        total_in,
        total_out,
        running_avg_price: cost_basis.last().map(|e| e.running_avg_price),
        latest_price,
        current_value_usd: latest_price.map(|p| p * current_balance),
        transaction_count: points.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockKaspaApi;
    use crate::domain::{day_start_ms, PricePoint, TransactionRecord, TxInput, TxOutput};
    use chrono::NaiveDate;

    const ME: &str = "kaspa:qme";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn receive(id: &str, d: u32, kas: i64) -> TransactionRecord {
        TransactionRecord {
            transaction_id: id.to_string(),
            block_time: TimeMs::new(day_start_ms(day(d)) + 1_000),
            inputs: vec![TxInput {
                previous_outpoint_address: Some("kaspa:qother".to_string()),
                previous_outpoint_amount_sompi: kas * 100_000_000,
            }],
            outputs: vec![TxOutput {
                script_public_key_address: Some(ME.to_string()),
                amount_sompi: kas * 100_000_000,
            }],
            is_accepted: true,
        }
    }

    fn engine(api: MockKaspaApi, prices: PriceHistory) -> WalletEngine {
        WalletEngine::new(Arc::new(api), Arc::new(prices), WalletConfig::default())
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionStatus::Ready.is_terminal());
        assert!(SessionStatus::Partial.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(!SessionStatus::Pricing.is_terminal());
    }

    #[tokio::test]
    async fn test_ready_session_with_priced_ledger() {
        let api = MockKaspaApi::new()
            .with_balance(dec("30"))
            .with_transactions(vec![receive("a", 2, 10), receive("b", 4, 20)]);
        let prices = PriceHistory::from_points(vec![
            PricePoint::new(day(1), dec("0.1")),
            PricePoint::new(day(3), dec("0.4")),
        ]);
        let report = engine(api, prices).run(&WalletRequest::new(ME)).await.unwrap();

        assert_eq!(report.status, SessionStatus::Ready);
        assert!(report.warnings.is_empty());
        assert_eq!(report.utxo_balance, Some(dec("30")));
        assert_eq!(report.ledger.len(), 2);
        assert_eq!(report.ledger[0].price_usd, Some(dec("0.1")));
        assert_eq!(report.ledger[1].value_usd, Some(dec("8")));
        // (10 * 0.1 + 20 * 0.4) / 30
        assert_eq!(report.summary.running_avg_price, Some(dec("0.3")));
        assert_eq!(report.summary.current_value_usd, Some(dec("12")));
        assert_eq!(report.daily.first().unwrap().date, day(1));
        assert_eq!(report.daily.last().unwrap().date, day(4));
    }

    #[tokio::test]
    async fn test_utxo_mismatch_is_reported() {
        let api = MockKaspaApi::new()
            .with_balance(dec("30"))
            .with_utxo_balance(dec("25"))
            .with_transactions(vec![receive("a", 2, 10), receive("b", 4, 20)]);
        let report = engine(api, PriceHistory::empty())
            .run(&WalletRequest::new(ME))
            .await
            .unwrap();

        assert_eq!(report.status, SessionStatus::Ready);
        assert_eq!(report.utxo_balance, Some(dec("25")));
        assert!(report.warnings.iter().any(|w| w.contains("UTXO sum 25")));
        // Reconstruction stays anchored on the reported balance.
        assert_eq!(report.ledger[1].balance_after, dec("30"));
    }

    #[tokio::test]
    async fn test_missing_balance_fails() {
        let api = MockKaspaApi::new().with_transactions(vec![receive("a", 2, 10)]);
        let err = engine(api, PriceHistory::empty())
            .run(&WalletRequest::new(ME))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::MissingBalance(_)));
    }

    #[tokio::test]
    async fn test_inverted_window_rejected_without_requests() {
        let api = MockKaspaApi::new().with_balance(dec("1"));
        let probe = api.clone();
        let request = WalletRequest {
            from: Some(TimeMs::new(10)),
            to: Some(TimeMs::new(5)),
            ..WalletRequest::new(ME)
        };
        let err = engine(api, PriceHistory::empty()).run(&request).await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidWindow(_)));
        assert_eq!(probe.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_without_data_fails() {
        let api = MockKaspaApi::new()
            .with_balance(dec("10"))
            .with_transactions(vec![receive("a", 2, 10)]);
        let err = engine(api, PriceHistory::empty())
            .run_with_cancel(&WalletRequest::new(ME), &AtomicBool::new(true))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Cancelled));
    }

    #[tokio::test]
    async fn test_window_restricts_ledger() {
        let api = MockKaspaApi::new()
            .with_balance(dec("60"))
            .with_transactions(vec![receive("a", 2, 10), receive("b", 4, 20), receive("c", 6, 30)]);
        let request = WalletRequest {
            from: Some(TimeMs::new(day_start_ms(day(3)))),
            to: Some(TimeMs::new(day_start_ms(day(5)))),
            ..WalletRequest::new(ME)
        };
        let report = engine(api, PriceHistory::empty()).run(&request).await.unwrap();
        assert_eq!(report.ledger.len(), 1);
        assert_eq!(report.ledger[0].transaction_id, "b");
    }

    #[test]
    fn test_summarize_totals() {
        let points = vec![
            BalancePoint {
                transaction_id: "a".to_string(),
                timestamp_ms: TimeMs::new(1),
                net_change_kas: dec("100"),
                direction: Direction::In,
                balance_after: dec("100"),
            },
            BalancePoint {
                transaction_id: "b".to_string(),
                timestamp_ms: TimeMs::new(2),
                net_change_kas: dec("-20"),
                direction: Direction::Out,
                balance_after: dec("80"),
            },
        ];
        let summary = summarize(&points, dec("80"), &PriceHistory::empty(), &[]);
        assert_eq!(summary.total_in, dec("100"));
        assert_eq!(summary.total_out, dec("20"));
        assert_eq!(summary.transaction_count, 2);
        assert!(summary.latest_price.is_none());
    }
}
