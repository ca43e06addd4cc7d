//! Account persistence across ledger restarts

use std::sync::Arc;
use street_empire::{FileAccountStore, InMemorySettlement, LedgerStateMachine, WalletIdentity};
use tempfile::TempDir;

fn ledger_in(dir: &TempDir, cash: u64) -> LedgerStateMachine {
    LedgerStateMachine::builder(WalletIdentity::parse("player").unwrap())
        .backend(Arc::new(InMemorySettlement::new()))
        .store(Arc::new(FileAccountStore::open(dir.path()).unwrap()))
        .initial_balances(cash, 0)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_committed_state_survives_restart() {
    let dir = TempDir::new().unwrap();

    let mut ledger = ledger_in(&dir, 200);
    ledger.try_mint().unwrap();
    let outcome = ledger.settle_pending().await.unwrap();
    assert!(outcome.is_committed());
    drop(ledger);

    let reopened = ledger_in(&dir, 9_999);
    assert_eq!(reopened.account().cash_balance, 0);
    assert_eq!(reopened.account().token_balance, 50);
}

#[tokio::test]
async fn test_hold_is_written_before_settlement() {
    let dir = TempDir::new().unwrap();
    let store = FileAccountStore::open(dir.path()).unwrap();
    let wallet = WalletIdentity::parse("player").unwrap();

    let mut ledger = ledger_in(&dir, 500);
    ledger.try_redeem().unwrap();

    // The file reflects the hold while the transfer is still outstanding
    let on_disk = street_empire::AccountStore::load(&store, &wallet).unwrap().unwrap();
    assert_eq!(on_disk.cash_balance, 0);

    ledger.settle_pending().await.unwrap();
    let on_disk = street_empire::AccountStore::load(&store, &wallet).unwrap().unwrap();
    assert_eq!(on_disk.cash_balance, 0);
}

#[tokio::test]
async fn test_abandoned_settlement_leaves_hold_spent() {
    let dir = TempDir::new().unwrap();

    let mut ledger = ledger_in(&dir, 500);
    ledger.try_redeem().unwrap();
    drop(ledger);

    // Only the held balance survives; nothing is released on reopen
    let reopened = ledger_in(&dir, 9_999);
    assert_eq!(reopened.account().cash_balance, 0);
    assert!(reopened.pending_rule().is_none());
}

#[test]
fn test_heist_is_persisted() {
    let dir = TempDir::new().unwrap();
    let mut ledger = ledger_in(&dir, 0);
    ledger.try_heist().unwrap();
    ledger.try_heist().unwrap();
    drop(ledger);

    assert_eq!(ledger_in(&dir, 0).account().cash_balance, 200);
}
