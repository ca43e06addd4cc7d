//! Driver run loop and shutdown

use std::sync::Arc;
use std::time::Duration;
use street_empire::driver::{DriverError, DriverSettings, GameLoopDriver, InputEvent};
use street_empire::{
    AccountStore, FileAccountStore, InMemorySettlement, LedgerStateMachine, SettlementError, WalletIdentity,
};
use crate::mocks::{ledger_over, GatedSettlement, ScriptedDisplay};

fn settings() -> DriverSettings {
    DriverSettings {
        frame_interval: Duration::from_millis(1),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_run_stops_on_close() {
    let ledger = ledger_over(Arc::new(InMemorySettlement::new()), 0);
    let display = ScriptedDisplay::new(vec![
        vec![InputEvent::key_down('h')],
        vec![InputEvent::key_down('h')],
        vec![InputEvent::close()],
    ]);

    let ledger = GameLoopDriver::new(ledger, display, settings()).run().await.into_result().unwrap();
    assert_eq!(ledger.account().cash_balance, 200);
}

#[tokio::test]
async fn test_shutdown_waits_for_pending_settlement() {
    let backend = GatedSettlement::new();
    let ledger = ledger_over(Arc::new(backend.clone()), 500);
    let display = ScriptedDisplay::new(vec![vec![InputEvent::key_down('r')]]);
    let driver = GameLoopDriver::new(ledger, display, settings());
    let shutdown = driver.shutdown_token();

    let handle = tokio::spawn(driver.run());
    while backend.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    shutdown.cancel();
    backend.release();

    let ledger = handle.await.unwrap().into_result().unwrap();
    assert!(ledger.pending().is_none());
    assert_eq!(ledger.account().cash_balance, 0);
    assert_eq!(ledger.journal().redemptions, 1);
}

#[tokio::test]
async fn test_display_failure_still_settles_pending_mint() {
    let dir = tempfile::TempDir::new().unwrap();
    let backend = GatedSettlement::new();
    let player = WalletIdentity::parse("player").unwrap();
    let ledger = LedgerStateMachine::builder(player.clone())
        .backend(Arc::new(backend.clone()))
        .store(Arc::new(FileAccountStore::open(dir.path()).unwrap()))
        .initial_balances(200, 0)
        .build()
        .unwrap();

    let display = ScriptedDisplay::new(vec![vec![InputEvent::key_down('m')]]).fail_after_frames(1);
    let handle = tokio::spawn(GameLoopDriver::new(ledger, display, settings()).run());
    while backend.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    backend.release();

    let exit = handle.await.unwrap();
    assert!(matches!(exit.error, Some(DriverError::Display(_))));
    assert!(exit.ledger.pending().is_none());
    assert_eq!(exit.ledger.account().cash_balance, 0);
    assert_eq!(exit.ledger.account().token_balance, 50);
    assert_eq!(backend.inner.tokens_of(&player), 50);

    // The committed mint reached the store before the error was handed back
    let stored = FileAccountStore::open(dir.path()).unwrap().load(&player).unwrap().unwrap();
    assert_eq!(stored.cash_balance, 0);
    assert_eq!(stored.token_balance, 50);
}

#[tokio::test]
async fn test_display_failure_rolls_back_failed_redeem() {
    let backend = InMemorySettlement::new().with_latency(Duration::from_millis(20));
    backend.fail_next_transfer(SettlementError::Transaction { message: "rejected".to_string() });
    let ledger = ledger_over(Arc::new(backend), 500);

    let display = ScriptedDisplay::new(vec![vec![InputEvent::key_down('r')]]).fail_after_frames(1);
    let exit = GameLoopDriver::new(ledger, display, settings()).run().await;

    assert!(exit.error.is_some());
    assert!(exit.ledger.pending().is_none());
    assert_eq!(exit.ledger.account().cash_balance, 500);
    assert!(exit.ledger.reconcile().is_ok());
}
