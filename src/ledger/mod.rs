//! Player-economy ledger

pub mod account;
pub mod journal;
pub mod pending;
pub mod state_machine;

pub use account::{BalanceReading, PlayerAccount};
pub use journal::{LedgerJournal, SettlementReceipt};
pub use pending::{OperationId, OperationOutcome, OperationStatus, OperationTicket, PendingOperation};
pub use state_machine::{LedgerBuilder, LedgerStateMachine, DEFAULT_SETTLEMENT_TIMEOUT};
