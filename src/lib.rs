//! Street Empire - player-economy ledger for an arcade heist game
//!
//! Players earn cash from heists, redeem cash for a transfer from a treasury
//! wallet, and spend cash to mint reward tokens. Every mutation goes through
//! the [`LedgerStateMachine`]:
//! - cash and token balances never go negative
//! - at most one externally-settled operation is pending at a time
//! - a failed settlement restores the pre-attempt cash balance

pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod ledger;
pub mod persistence;
pub mod session;
pub mod settlement;
pub mod wallet;

// Re-export commonly used types for convenience
pub use error::{LedgerError, LedgerResult, SettlementError};

pub use catalog::{ExternalCall, RewardCatalog, RewardRule, RewardSettings, RuleId, BASE_UNITS_PER_DISPLAY_UNIT};

pub use ledger::{
    BalanceReading, LedgerStateMachine, OperationOutcome, OperationStatus, OperationTicket,
    PendingOperation, PlayerAccount,
};

pub use settlement::{InMemorySettlement, RpcSettlement, SettlementBackend};

pub use persistence::{AccountStore, FileAccountStore, MemoryAccountStore};

pub use wallet::WalletIdentity;

pub use config::EmpireConfig;

pub use driver::{DisplayAdapter, GameLoopDriver, HudFrame, InputEvent};
