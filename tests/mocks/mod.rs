//! Mock implementations for testing

pub mod display;
pub mod settlement;
pub mod store;

pub use display::ScriptedDisplay;
pub use settlement::GatedSettlement;
pub use store::FailingStore;

use std::sync::Arc;
use street_empire::{InMemorySettlement, LedgerStateMachine, MemoryAccountStore, SettlementBackend, WalletIdentity};

/// Ledger for `player` over `backend` with a fresh memory store
pub fn ledger_over(backend: Arc<dyn SettlementBackend>, cash: u64) -> LedgerStateMachine {
    LedgerStateMachine::builder(WalletIdentity::parse("player").unwrap())
        .treasury(WalletIdentity::parse("treasury").unwrap())
        .backend(backend)
        .store(Arc::new(MemoryAccountStore::new()))
        .initial_balances(cash, 0)
        .build()
        .unwrap()
}

/// Ledger over an in-memory backend the caller keeps a handle to
pub fn memory_ledger(cash: u64) -> (LedgerStateMachine, InMemorySettlement) {
    let backend = InMemorySettlement::new();
    (ledger_over(Arc::new(backend.clone()), cash), backend)
}
