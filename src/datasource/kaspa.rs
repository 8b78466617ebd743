//! Kaspa REST API client (api.kaspa.org compatible).

use super::{KaspaApi, KaspaApiError, NetworkSummary, PageQuery, TransactionPage, MAX_PAGE_SIZE};
use crate::domain::{Address, Decimal, TimeMs, TransactionRecord, TxInput, TxOutput};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.kaspa.org";

/// Retry schedule for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_secs(4),
            max_interval: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.max_interval,
            // Attempts are bounded by `max_retries`, not wall time.
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Kaspa data source over the public REST API.
#[derive(Debug, Clone)]
pub struct KaspaRestClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl KaspaRestClient {
    /// Create a client with a per-request timeout.
    pub fn new(
        base_url: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, KaspaApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KaspaApiError::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, KaspaApiError> {
        let url = format!("{}{}", self.base_url, path);
        let attempts = AtomicU32::new(0);

        retry(self.retry.backoff(), || async {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            match self.get_once(&url, query).await {
                Ok(value) => Ok(value),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    warn!("GET {} failed (attempt {}): {}", url, attempt + 1, e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    async fn get_once(&self, url: &str, query: &[(&str, String)]) -> Result<Value, KaspaApiError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(KaspaApiError::RateLimited);
        }
        if status.is_server_error() {
            return Err(KaspaApiError::HttpError {
                status: status.as_u16(),
                message: "Server error".to_string(),
            });
        }
        if !status.is_success() {
            return Err(KaspaApiError::HttpError {
                status: status.as_u16(),
                message: "Client error".to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| KaspaApiError::ParseError(e.to_string()))
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> KaspaApiError {
    if e.is_timeout() {
        KaspaApiError::Timeout
    } else {
        KaspaApiError::NetworkError(e.to_string())
    }
}

#[async_trait]
impl KaspaApi for KaspaRestClient {
    async fn fetch_balance(&self, address: &Address) -> Result<Decimal, KaspaApiError> {
        debug!("Fetching balance for {}", address);
        let response = self
            .get_json(&format!("/addresses/{}/balance", address), &[])
            .await?;
        parse_balance(&response)
    }

    async fn fetch_transactions_page(
        &self,
        address: &Address,
        query: &PageQuery,
    ) -> Result<TransactionPage, KaspaApiError> {
        debug!(
            "Fetching transactions page for {} limit={} before={:?}",
            address, query.limit, query.before
        );

        let mut params: Vec<(&str, String)> = vec![
            ("limit", query.limit.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("resolve_previous_outpoints", "light".to_string()),
            ("acceptance", "accepted".to_string()),
        ];
        if let Some(before) = query.before {
            params.push(("before", before.as_ms().to_string()));
        }

        let response = self
            .get_json(
                &format!("/addresses/{}/full-transactions-page", address),
                &params,
            )
            .await?;
        parse_transactions_page(&response)
    }

    async fn fetch_utxo_balance(&self, address: &Address) -> Result<Decimal, KaspaApiError> {
        let response = self
            .get_json(&format!("/addresses/{}/utxos", address), &[])
            .await?;
        parse_utxo_balance(&response)
    }

    async fn fetch_transaction_count(&self, address: &Address) -> Result<u64, KaspaApiError> {
        let response = self
            .get_json(&format!("/addresses/{}/transactions-count", address), &[])
            .await?;
        response
            .get("total")
            .and_then(lenient_u64)
            .ok_or_else(|| KaspaApiError::ParseError("Missing total field".to_string()))
    }

    async fn fetch_network_summary(&self) -> Result<NetworkSummary, KaspaApiError> {
        let (supply, network, hashrate, reward, price, marketcap) = futures::join!(
            self.get_json("/info/coinsupply", &[]),
            self.get_json("/info/network", &[]),
            self.get_json("/info/hashrate", &[]),
            self.get_json("/info/blockreward", &[]),
            self.get_json("/info/price", &[]),
            self.get_json("/info/marketcap", &[]),
        );

        let parts = [&supply, &network, &hashrate, &reward, &price, &marketcap];
        if parts.iter().all(|r| r.is_err()) {
            return Err(supply.err().unwrap_or(KaspaApiError::Other(
                "all network endpoints failed".to_string(),
            )));
        }
        for err in parts.iter().filter_map(|r| r.as_ref().err()) {
            warn!("Network summary endpoint failed: {}", err);
        }

        Ok(build_network_summary(
            supply.ok(),
            network.ok(),
            hashrate.ok(),
            reward.ok(),
            price.ok(),
            marketcap.ok(),
        ))
    }
}

/// Integer that may be encoded as a JSON number or a numeric string.
fn lenient_i64(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn lenient_u64(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn lenient_f64(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn parse_balance(response: &Value) -> Result<Decimal, KaspaApiError> {
    response
        .get("balance")
        .and_then(lenient_i64)
        .map(Decimal::from_sompi)
        .ok_or_else(|| KaspaApiError::ParseError("Missing balance field".to_string()))
}

fn parse_utxo_balance(response: &Value) -> Result<Decimal, KaspaApiError> {
    let utxos = response
        .as_array()
        .ok_or_else(|| KaspaApiError::ParseError("Expected array response".to_string()))?;

    let mut total = Decimal::zero();
    for utxo in utxos {
        match utxo.pointer("/utxoEntry/amount").and_then(lenient_i64) {
            Some(sompi) => total += Decimal::from_sompi(sompi),
            None => warn!("Skipping UTXO without amount"),
        }
    }
    Ok(total)
}

fn parse_transactions_page(response: &Value) -> Result<TransactionPage, KaspaApiError> {
    let txs_json = response
        .as_array()
        .ok_or_else(|| KaspaApiError::ParseError("Expected array response".to_string()))?;

    let mut page = TransactionPage::default();
    for tx_json in txs_json {
        match parse_transaction(tx_json) {
            Ok(tx) => page.transactions.push(tx),
            Err(e) => {
                warn!("Failed to parse transaction: {}", e);
                page.malformed += 1;
            }
        }
    }
    Ok(page)
}

fn parse_transaction(tx_json: &Value) -> Result<TransactionRecord, KaspaApiError> {
    let transaction_id = tx_json
        .get("transaction_id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| KaspaApiError::ParseError("Missing transaction_id field".to_string()))?
        .to_string();

    let block_time = tx_json
        .get("block_time")
        .and_then(lenient_i64)
        .ok_or_else(|| {
            KaspaApiError::ParseError(format!("Missing block_time for {}", transaction_id))
        })?;

    let inputs = match tx_json.get("inputs") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|input| {
                let address = input
                    .get("previous_outpoint_address")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let amount = input.get("previous_outpoint_amount").and_then(lenient_i64);
                // An unresolved outpoint has neither field and cannot belong to the wallet.
                let amount_sompi = match (&address, amount) {
                    (_, Some(sompi)) => sompi,
                    (None, None) => 0,
                    (Some(_), None) => {
                        return Err(KaspaApiError::ParseError(format!(
                            "Input without amount in {}",
                            transaction_id
                        )))
                    }
                };
                Ok(TxInput {
                    previous_outpoint_address: address,
                    previous_outpoint_amount_sompi: amount_sompi,
                })
            })
            .collect::<Result<Vec<_>, KaspaApiError>>()?,
        Some(_) => {
            return Err(KaspaApiError::ParseError(format!(
                "inputs is not an array for {}",
                transaction_id
            )))
        }
    };

    let outputs = match tx_json.get("outputs") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|output| {
                let amount_sompi = output.get("amount").and_then(lenient_i64).ok_or_else(|| {
                    KaspaApiError::ParseError(format!("Output without amount in {}", transaction_id))
                })?;
                Ok(TxOutput {
                    script_public_key_address: output
                        .get("script_public_key_address")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    amount_sompi,
                })
            })
            .collect::<Result<Vec<_>, KaspaApiError>>()?,
        Some(_) => {
            return Err(KaspaApiError::ParseError(format!(
                "outputs is not an array for {}",
                transaction_id
            )))
        }
    };

    let is_accepted = tx_json
        .get("is_accepted")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    Ok(TransactionRecord {
        transaction_id,
        block_time: TimeMs::new(block_time),
        inputs,
        outputs,
        is_accepted,
    })
}

fn build_network_summary(
    supply: Option<Value>,
    network: Option<Value>,
    hashrate: Option<Value>,
    reward: Option<Value>,
    price: Option<Value>,
    marketcap: Option<Value>,
) -> NetworkSummary {
    let field = |v: &Option<Value>, name: &str| v.as_ref().and_then(|v| v.get(name).cloned());

    NetworkSummary {
        network_name: field(&network, "networkName").and_then(|v| v.as_str().map(str::to_string)),
        block_count: field(&network, "blockCount").as_ref().and_then(lenient_u64),
        difficulty: field(&network, "difficulty").as_ref().and_then(lenient_f64),
        virtual_daa_score: field(&network, "virtualDaaScore").as_ref().and_then(lenient_u64),
        circulating_supply_kas: field(&supply, "circulatingSupply")
            .as_ref()
            .and_then(lenient_i64)
            .map(Decimal::from_sompi),
        max_supply_kas: field(&supply, "maxSupply")
            .as_ref()
            .and_then(lenient_i64)
            .map(Decimal::from_sompi),
        hashrate_ths: field(&hashrate, "hashrate").as_ref().and_then(lenient_f64),
        block_reward_kas: field(&reward, "blockreward").as_ref().and_then(lenient_f64),
        price_usd: field(&price, "price").as_ref().and_then(lenient_f64),
        market_cap_usd: field(&marketcap, "marketcap").as_ref().and_then(lenient_f64),
    }
}
