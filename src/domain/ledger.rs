//! Wallet ledger outputs: net changes, balance rows, cost-basis events.

use crate::domain::{Decimal, Direction, TimeMs};
use chrono::NaiveDate;
use serde::Serialize;

/// Signed balance change of one transaction for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetChange {
    pub transaction_id: String,
    pub timestamp_ms: TimeMs,
    pub net_change_kas: Decimal,
    pub direction: Direction,
}

/// Net change paired with the reconstructed balance right after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancePoint {
    pub transaction_id: String,
    pub timestamp_ms: TimeMs,
    pub net_change_kas: Decimal,
    pub direction: Direction,
    pub balance_after: Decimal,
}

/// Per-transaction row of the enriched ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub transaction_id: String,
    pub timestamp_ms: TimeMs,
    pub date: NaiveDate,
    pub net_change_kas: Decimal,
    pub direction: Direction,
    pub balance_after: Decimal,
    pub price_usd: Option<Decimal>,
    pub value_usd: Option<Decimal>,
}

/// One calendar day of the resampled balance/price/avg-cost series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRow {
    pub date: NaiveDate,
    pub balance_kas: Decimal,
    pub price_usd: Option<Decimal>,
    pub value_usd: Option<Decimal>,
    pub avg_cost_usd: Option<Decimal>,
}

/// Purchase event in the running volume-weighted average cost basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBasisEvent {
    pub timestamp_ms: TimeMs,
    pub kas_amount: Decimal,
    pub price_at_purchase: Decimal,
    pub running_avg_price: Decimal,
}

/// Scalar summary of a wallet session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub current_balance: Decimal,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub running_avg_price: Option<Decimal>,
    pub latest_price: Option<Decimal>,
    pub current_value_usd: Option<Decimal>,
    pub transaction_count: usize,
}
