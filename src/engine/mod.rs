//! Pure computation: the power-law kernel and the wallet ledger folds.
//!
//! Nothing here performs I/O or logs.

pub mod balance;
pub mod cost_basis;
pub mod deviation;
pub mod net_change;
pub mod power_law;

pub use balance::{daily_balances, opening_balance, reconstruct_balances};
pub use cost_basis::{cost_basis_history, CostBasisTracker};
pub use deviation::{deviation, oscillator, BandConfig, DeviationPoint};
pub use net_change::{extract_net_changes, net_change};
pub use power_law::{
    expected_series, fit_pairs, fit_power_law, slope_delta_pct, FitError, PowerLawFit,
};
