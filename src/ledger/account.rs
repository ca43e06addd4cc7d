//! Player account and balance readings

use serde::{Deserialize, Serialize};
use crate::catalog::base_units_to_display;
use crate::wallet::WalletIdentity;

/// Balances of one player, owned by the ledger state machine
///
/// Unsigned fields make a negative balance unrepresentable; every mutation in
/// the ledger goes through checked arithmetic before it is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAccount {
    pub wallet: WalletIdentity,
    pub cash_balance: u64,
    pub token_balance: u64,
}

impl PlayerAccount {
    pub fn new(wallet: WalletIdentity) -> Self {
        Self::with_balances(wallet, 0, 0)
    }

    pub fn with_balances(wallet: WalletIdentity, cash_balance: u64, token_balance: u64) -> Self {
        Self {
            wallet,
            cash_balance,
            token_balance,
        }
    }
}

/// External wallet balance as last reported by the settlement backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReading {
    pub base_units: u64,
    /// `base_units` converted to display units
    pub display: f64,
    /// Set when the latest query failed and this is the last known value
    pub stale: bool,
    pub observed_at: chrono::DateTime<chrono::Utc>,
}

impl BalanceReading {
    pub fn fresh(base_units: u64) -> Self {
        Self {
            base_units,
            display: base_units_to_display(base_units),
            stale: false,
            observed_at: chrono::Utc::now(),
        }
    }
}
