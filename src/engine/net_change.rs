use crate::domain::{Address, Direction, NetChange, TransactionRecord};

/// Signed balance change of `tx` for `address`: outputs to it minus inputs from it.
///
/// A zero change is classified `Out` and kept.
pub fn net_change(tx: &TransactionRecord, address: &Address) -> NetChange {
    let received = tx.received_by(address.as_str());
    let spent = tx.spent_by(address.as_str());
    let net = received - spent;

    NetChange {
        transaction_id: tx.transaction_id.clone(),
        timestamp_ms: tx.block_time,
        net_change_kas: net,
        direction: if net.is_positive() {
            Direction::In
        } else {
            Direction::Out
        },
    }
}

/// Net changes for every transaction, in input order.
pub fn extract_net_changes(txs: &[TransactionRecord], address: &Address) -> Vec<NetChange> {
    txs.iter().map(|tx| net_change(tx, address)).collect()
}
