//! Blockchain transaction records as returned by the full-transactions endpoint.

use crate::domain::{Decimal, TimeMs};
use serde::Serialize;

/// A spent previous outpoint, resolved to its owner and amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxInput {
    pub previous_outpoint_address: Option<String>,
    pub previous_outpoint_amount_sompi: i64,
}

/// A created output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutput {
    pub script_public_key_address: Option<String>,
    pub amount_sompi: i64,
}

/// One accepted transaction touching the tracked address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub block_time: TimeMs,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub is_accepted: bool,
}

impl TransactionRecord {
    /// KAS received by `address` in this transaction.
    pub fn received_by(&self, address: &str) -> Decimal {
        self.outputs
            .iter()
            .filter(|o| o.script_public_key_address.as_deref() == Some(address))
            .map(|o| Decimal::from_sompi(o.amount_sompi))
            .sum()
    }

    /// KAS spent from `address` in this transaction.
    pub fn spent_by(&self, address: &str) -> Decimal {
        self.inputs
            .iter()
            .filter(|i| i.previous_outpoint_address.as_deref() == Some(address))
            .map(|i| Decimal::from_sompi(i.previous_outpoint_amount_sompi))
            .sum()
    }
}
