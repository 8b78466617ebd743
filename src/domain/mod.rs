//! Domain types for the Kaspa analytics service.
//!
//! This module provides:
//! - Lossless KAS/USD amounts via the Decimal wrapper
//! - Domain primitives: TimeMs, Address, Direction
//! - Daily series for the analytic kernel and the price-history view
//! - Transaction records and the wallet ledger outputs derived from them

pub mod decimal;
pub mod ledger;
pub mod price;
pub mod primitives;
pub mod series;
pub mod transaction;

pub use decimal::Decimal;
pub use ledger::{
    BalancePoint, BalanceRow, CostBasisEvent, LedgerEntry, NetChange, WalletSummary,
};
pub use price::{PriceHistory, PricePoint};
pub use primitives::{
    day_end_ms, day_start_ms, days_inclusive, Address, AddressParseError, Direction, TimeMs,
};
pub use series::{pair_by_date, PairedPoint, Series, SeriesKind, TimePoint};
pub use transaction::{TransactionRecord, TxInput, TxOutput};
